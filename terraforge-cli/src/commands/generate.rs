//! Generate command - run one terrain job from the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use terraforge::geo::area_acres;
use terraforge::http::AsyncReqwestClient;
use terraforge::job::JobStatus;
use terraforge::{Coordinate, MemoryJobStore, ServiceConfig, TerrainPipeline};

use crate::error::CliError;

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Polygon vertices as "lat,lng" pairs, e.g. 30.2695,-97.7405
    #[arg(required = true, num_args = 3..)]
    pub coords: Vec<String>,

    /// Output directory for the job artifacts
    #[arg(short, long, default_value = "terrain")]
    pub out: PathBuf,

    /// Flatten terrain outside the polygon to a skirt
    #[arg(long)]
    pub mask: bool,

    /// Output elevation grid resolution (vertices per side)
    #[arg(long, default_value_t = 128)]
    pub grid: u32,
}

/// Run the generate command.
pub async fn run(args: GenerateArgs) -> Result<(), CliError> {
    let polygon = parse_coords(&args.coords)?;
    let area = area_acres(&polygon);
    println!(
        "Polygon: {} vertices, {} acres",
        polygon.len(),
        style(format!("{:.2}", area)).bold()
    );

    let config = ServiceConfig::default()
        .with_output_dir(&args.out)
        .with_grid_size(args.grid, args.grid)
        .with_polygon_mask(args.mask);

    let http_client = AsyncReqwestClient::new().map_err(|e| CliError::Client(e.to_string()))?;
    let pipeline = TerrainPipeline::new(config, http_client, Arc::new(MemoryJobStore::new()));

    let id = pipeline.submit(polygon, area)?;
    println!("Job {} started", style(&id).cyan());

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.green} {pos:>3}% {msg}")
            .expect("progress bar template"),
    );

    let job = loop {
        let job = pipeline.status(&id).expect("job exists in local store");
        bar.set_position(job.progress as u64);
        bar.set_message(job.message.clone());
        if job.is_terminal() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };
    bar.finish_and_clear();

    match job.status {
        JobStatus::Completed => {
            let job_dir = args.out.join(&id);
            println!("{}", style("Terrain generated:").green().bold());
            println!("  Snapshot: {}", job_dir.join("snapshot.png").display());
            println!("  Scene:    {}", job_dir.join("terrain.glb").display());
            println!("  Solid:    {}", job_dir.join("terrain.stl").display());
            Ok(())
        }
        _ => Err(CliError::JobFailed(
            job.error.unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

/// Parses "lat,lng" pairs into coordinates.
fn parse_coords(pairs: &[String]) -> Result<Vec<Coordinate>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (lat, lng) = pair.split_once(',').ok_or_else(|| {
                CliError::InvalidCoordinates(format!("expected lat,lng: {}", pair))
            })?;
            let lat = lat.trim().parse().map_err(|_| {
                CliError::InvalidCoordinates(format!("bad latitude: {}", pair))
            })?;
            let lng = lng.trim().parse().map_err(|_| {
                CliError::InvalidCoordinates(format!("bad longitude: {}", pair))
            })?;
            Ok(Coordinate::new(lat, lng))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coords() {
        let pairs = vec![
            "30.2695,-97.7405".to_string(),
            "30.2695, -97.7395".to_string(),
            "30.2705,-97.7395".to_string(),
        ];

        let coords = parse_coords(&pairs).unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0].lat, 30.2695);
        assert_eq!(coords[1].lng, -97.7395);
    }

    #[test]
    fn test_parse_coords_rejects_garbage() {
        let pairs = vec!["not-a-pair".to_string()];
        assert!(parse_coords(&pairs).is_err());

        let pairs = vec!["x,y".to_string()];
        assert!(parse_coords(&pairs).is_err());
    }
}
