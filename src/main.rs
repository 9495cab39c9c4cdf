use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::Path;
use std::time::Instant;

use video_dither::cli::Args;
use video_dither::config::{DitherConfig, Method};
use video_dither::encode::{assemble_video, is_ffmpeg_available, suggested_command};
use video_dither::error::DitherError;
use video_dither::json_output::{JsonMessage, JsonReporter};
use video_dither::pipeline::{Pipeline, PipelineEvent};
use video_dither::sink::{frame_file_name, PngSequenceSink};
use video_dither::source::open_source;
use video_dither::utils::{
    create_progress_bar, error_println, format_duration, frames_per_second, validate_inputs,
    verbose_println, warn_println,
};

fn main() {
    let mut args = Args::parse();
    let json_mode = args.json_progress;

    if let Err(err) = args.load_and_merge_config().and_then(|_| run(&args)) {
        if json_mode {
            JsonMessage::Failed {
                error: format!("{:#}", err),
                frame: err
                    .downcast_ref::<DitherError>()
                    .and_then(DitherError::frame_index),
            }
            .emit();
        } else {
            error_println(&format!("{:#}", err));
        }
        std::process::exit(1);
    }
}

fn print_configuration(args: &Args, config: &DitherConfig, input: &Path) {
    println!("{}", style("Configuration:").bold());
    println!("  Input: {}", input.display());
    println!("  Output directory: {}", args.output_dir.display());
    println!("  Method: {}", config.method());
    println!(
        "  Color mode: {}",
        if config.is_color() { "Color" } else { "Grayscale" }
    );
    println!("  Target size: {}x{}", config.width(), config.height());
    match config.frame_limit() {
        Some(limit) => println!("  Max frames: {}", limit),
        None => println!("  Max frames: all"),
    }
    if config.method().is_error_diffusion() {
        println!("  Dither strength: {}", config.strength());
    }
    match config.method() {
        Method::Ordered => {
            println!("  Matrix size: {0}x{0}", config.matrix_size())
        }
        Method::Random => {
            println!("  Threshold variance: {}", config.threshold_variance());
            println!("  Seed: {}", config.seed());
        }
        _ => {}
    }
    println!("  Parallel jobs: {}", config.jobs());
    println!("  FPS: {}", config.fps());
    if args.rgb_output {
        println!("  RGB output: enabled");
    }
    println!();
}

fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let json_mode = args.json_progress;

    if !json_mode {
        println!("{}", style("Video Dither").bold().blue());
        println!("{}", style("Retro dithering for video frames").dim());
        println!();
    }

    validate_inputs(args)?;
    let input = args
        .input
        .as_deref()
        .context("No input given")?;

    // Every parameter is checked before any frame is decoded
    let settings = args.to_settings();
    let config = settings.validate()?;

    if args.verbose && !json_mode {
        print_configuration(args, &config, input);
    }

    if args.encode.is_some() && !is_ffmpeg_available() {
        return Err(anyhow::anyhow!(
            "--encode requires ffmpeg on PATH. Install it or drop --encode and assemble the frames manually"
        ));
    }

    let mut source = open_source(input)
        .with_context(|| format!("Failed to open input: {}", input.display()))?;
    let mut sink = PngSequenceSink::create(&args.output_dir, args.force)
        .context("Failed to prepare output directory")?
        .with_rgb_output(args.rgb_output);

    let pipeline = Pipeline::new(&config)?;
    let total = pipeline.expected_frames(source.as_ref());
    verbose_println(
        args.verbose && !json_mode,
        &format!(
            "Frame source reports {}",
            source
                .frame_count_hint()
                .map_or("an unknown number of frames".to_string(), |n| format!("{} frames", n))
        ),
    );

    if json_mode {
        JsonMessage::Started {
            input_path: input.display().to_string(),
            output_dir: args.output_dir.display().to_string(),
            settings,
        }
        .emit();
    } else {
        println!(
            "Processing {} using {} dithering...",
            match total {
                Some(total) => format!("up to {} frames", total),
                None => "all frames".to_string(),
            },
            config.method()
        );
    }

    let summary = if json_mode {
        let mut reporter = JsonReporter::new(total);
        pipeline.run(source.as_mut(), &mut sink, |event| {
            let PipelineEvent::FrameWritten { index } = event;
            JsonMessage::FrameWritten {
                index,
                output_path: args.output_dir.join(frame_file_name(index)).display().to_string(),
            }
            .emit();
            reporter.progress(index + 1);
        })?
    } else {
        let progress = create_progress_bar(total);
        progress.set_message(config.label());
        let result = pipeline.run(source.as_mut(), &mut sink, |event| {
            let PipelineEvent::FrameWritten { index } = event;
            progress.set_position(index as u64 + 1);
        });
        match &result {
            Ok(_) => progress.finish_with_message("done"),
            Err(_) => progress.abandon_with_message("failed"),
        }
        result?
    };

    // Release the decoder before handing the frames to ffmpeg
    drop(source);

    let video_path = match &args.encode {
        Some(video) if summary.frames_written > 0 => {
            if !json_mode {
                println!("Encoding {} ...", video.display());
            }
            assemble_video(&args.output_dir, config.fps(), video)?;
            Some(video.clone())
        }
        Some(_) => {
            if !json_mode {
                warn_println("No frames written, skipping video encoding");
            }
            None
        }
        None => None,
    };

    if json_mode {
        JsonMessage::Summary {
            frames_written: summary.frames_written,
            duration_secs: start_time.elapsed().as_secs_f64(),
            stopped_early: summary.stopped_early,
            video_path: video_path.map(|p| p.display().to_string()),
        }
        .emit();
        return Ok(());
    }

    println!();
    println!("{}", style("Results Summary:").bold().green());
    println!(
        "  Exported {} frames to {}",
        style(summary.frames_written).bold().green(),
        args.output_dir.display()
    );
    println!(
        "  Dithering time: {} ({:.1} frames/s)",
        format_duration(summary.elapsed),
        frames_per_second(summary.frames_written, summary.elapsed)
    );
    println!("  Total time: {}", format_duration(start_time.elapsed()));

    match video_path {
        Some(video) => {
            println!("  Video: {}", style(video.display()).bold().cyan());
        }
        None if summary.frames_written > 0 => {
            println!();
            println!("Done! You can now create a video from frames using:");
            println!("{}", style(suggested_command(&args.output_dir, &config)).cyan());
        }
        None => {}
    }

    Ok(())
}
