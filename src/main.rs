// Clippy allows
#![allow(clippy::too_many_arguments)]

//! LanePack: pack genomic feature tracks into lanes and render them.
//!
//! Usage: lanepack <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use log::debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use lanepack::cache::{cached_alignment_rows, cached_transcript_rows, FeatureCache};
use lanepack::draw::TrackStyle;
use lanepack::feature::{Result, TrackError};
use lanepack::gtf;
use lanepack::psl;
use lanepack::region::Region;
use lanepack::render::Figure;
use lanepack::synth;
use lanepack::track::{pack_track, pack_tracks, PackedTrack, TrackJob};

#[derive(Parser)]
#[command(name = "lanepack")]
#[command(version)]
#[command(about = "LanePack: greedy lane packing and SVG rendering for genomic feature tracks", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render GTF and PSL tracks as a stacked-panel SVG figure
    Render {
        /// GTF annotation file for the transcript panel
        #[arg(long)]
        gtf: Option<PathBuf>,

        /// PSL alignment file (repeat for up to two alignment panels)
        #[arg(long)]
        psl: Vec<PathBuf>,

        /// Target region, e.g. chr7:45232945-45240000
        #[arg(short, long)]
        region: String,

        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,

        /// Cache directory for parsed rows (omit to disable caching)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Override the transcript panel's lane spacing
        #[arg(long)]
        transcript_spacing: Option<f64>,

        /// Override the alignment panels' lane spacing
        #[arg(long)]
        alignment_spacing: Option<f64>,
    },

    /// Pack one track and print its lane assignment as TSV
    Pack {
        /// GTF annotation file
        #[arg(long, conflicts_with = "psl")]
        gtf: Option<PathBuf>,

        /// PSL alignment file
        #[arg(long)]
        psl: Option<PathBuf>,

        /// Target region, e.g. chr7:45232945-45240000
        #[arg(short, long)]
        region: String,

        /// Vertical distance between adjacent lanes
        #[arg(short, long, default_value = "0.1")]
        spacing: f64,
    },

    /// Generate a synthetic GTF/PSL dataset for testing
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "./lanepack_data")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of transcripts in the GTF file
        #[arg(long, default_value = "40")]
        transcripts: usize,

        /// Number of aligned reads per PSL file
        #[arg(long, default_value = "200")]
        reads: usize,

        /// Region to generate features in
        #[arg(short, long, default_value = "chr7:45232945-45240000")]
        region: String,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .expect("Failed to initialize thread pool");
    }

    let result = match cli.command {
        Commands::Render {
            gtf,
            psl,
            region,
            output,
            cache_dir,
            transcript_spacing,
            alignment_spacing,
        } => run_render(
            gtf,
            psl,
            region,
            output,
            cache_dir,
            transcript_spacing,
            alignment_spacing,
        ),

        Commands::Pack {
            gtf,
            psl,
            region,
            spacing,
        } => run_pack(gtf, psl, region, spacing),

        Commands::Generate {
            output,
            seed,
            transcripts,
            reads,
            region,
            force,
        } => run_generate(output, seed, transcripts, reads, region, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_render(
    gtf: Option<PathBuf>,
    psl: Vec<PathBuf>,
    region: String,
    output: PathBuf,
    cache_dir: Option<PathBuf>,
    transcript_spacing: Option<f64>,
    alignment_spacing: Option<f64>,
) -> Result<()> {
    if gtf.is_none() && psl.is_empty() {
        return Err(TrackError::Config(
            "render needs --gtf and/or --psl input".to_string(),
        ));
    }
    if psl.len() > 2 {
        return Err(TrackError::Config(
            "the figure has two alignment panels; pass --psl at most twice".to_string(),
        ));
    }

    let region: Region = region.parse()?;
    let cache = cache_dir.map(FeatureCache::new).transpose()?;
    if let Some(cache) = &cache {
        debug!("caching parsed rows under {}", cache.dir().display());
    }

    let mut jobs = Vec::new();
    if let Some(path) = &gtf {
        let rows = cached_transcript_rows(cache.as_ref(), path, &region)?;
        let mut style = TrackStyle::transcripts_default();
        if let Some(spacing) = transcript_spacing {
            style.lane_spacing = spacing;
        }
        jobs.push(TrackJob::transcripts(rows, style));
    }
    let alignment_styles = [TrackStyle::alignments_default(), TrackStyle::alignments_dense()];
    for (path, mut style) in psl.iter().zip(alignment_styles) {
        let rows = cached_alignment_rows(cache.as_ref(), path, &region)?;
        if let Some(spacing) = alignment_spacing {
            style.lane_spacing = spacing;
        }
        jobs.push(TrackJob::alignments(rows, style));
    }

    let tracks = pack_tracks(jobs)?;

    // Transcripts fill the top panel, alignment tracks the two below it. A
    // missing GTF leaves the top panel empty so alignments keep their rows.
    let mut figure = Figure::reference(&region);
    let mut panel = usize::from(gtf.is_none());
    for track in &tracks {
        figure.panel_mut(panel).add_rects(&track.rects);
        panel += 1;
    }
    figure.write_svg(&output)?;
    Ok(())
}

fn run_pack(
    gtf: Option<PathBuf>,
    psl: Option<PathBuf>,
    region: String,
    spacing: f64,
) -> Result<()> {
    let region: Region = region.parse()?;

    let job = match (gtf, psl) {
        (Some(path), None) => {
            let mut style = TrackStyle::transcripts_default();
            style.lane_spacing = spacing;
            TrackJob::transcripts(gtf::read_transcript_rows(&path, &region)?, style)
        }
        (None, Some(path)) => {
            let mut style = TrackStyle::alignments_default();
            style.lane_spacing = spacing;
            TrackJob::alignments(psl::read_alignment_rows(&path, &region)?, style)
        }
        _ => {
            return Err(TrackError::Config(
                "pack needs exactly one of --gtf or --psl".to_string(),
            ))
        }
    };

    let track = pack_track(job)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_assignment(&mut handle, &track)?;
    handle.flush()?;
    Ok(())
}

fn write_assignment<W: Write>(writer: &mut W, track: &PackedTrack) -> Result<()> {
    let mut buf = itoa::Buffer::new();
    for (group, &lane) in track.groups.iter().zip(track.assignment.lanes()) {
        writer.write_all(group.id.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(lane).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(group.span.start).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(group.span.end).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn run_generate(
    output: PathBuf,
    seed: u64,
    transcripts: usize,
    reads: usize,
    region: String,
    force: bool,
) -> Result<()> {
    let region: Region = region.parse()?;
    fs::create_dir_all(&output)?;

    let gtf_path = output.join("annotation.gtf");
    let psl_a = output.join("reads_a.psl");
    let psl_b = output.join("reads_b.psl");
    if !force && [&gtf_path, &psl_a, &psl_b].iter().any(|p| p.exists()) {
        eprintln!(
            "Skipping {}: files exist (use --force to overwrite)",
            output.display()
        );
        return Ok(());
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let rows = synth::generate_transcripts(&region, transcripts, &mut rng);
    synth::write_gtf(&gtf_path, &region, &rows)?;
    report_saved(&gtf_path, transcripts, "transcripts");

    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let rows = synth::generate_alignments(&region, reads, &mut rng);
    synth::write_psl(&psl_a, &region, &rows)?;
    report_saved(&psl_a, reads, "reads");

    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(2));
    let rows = synth::generate_alignments(&region, reads, &mut rng);
    synth::write_psl(&psl_b, &region, &rows)?;
    report_saved(&psl_b, reads, "reads");

    Ok(())
}

fn report_saved(path: &Path, count: usize, what: &str) {
    eprintln!("Saved: {} ({} {})", path.display(), count, what);
}
