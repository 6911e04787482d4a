//! Terrain-generation pipeline orchestrator.
//!
//! Coordinates the full flow for one job: polygon validation, bounding-box
//! math, imagery fetch, tile discovery/filter/download, elevation sampling,
//! mesh synthesis, and artifact export. Each job runs as one spawned task;
//! the caller gets the job id back immediately and polls the injected
//! [`JobStore`] for progress.
//!
//! # State machine
//!
//! Jobs start at `processing`/0 and advance through fixed checkpoints
//! (10 bbox, 20 imagery, 30 discovery, 35 filter, 40 download, 50 sample,
//! 60 mesh, 70 output dir, 75 imagery save, 80 texture bake, 85 GLB,
//! 90 STL, 100 done). Any uncaught step error transitions the job straight
//! to `error` with the error's display text; no step is retried.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogError, TileCatalog};
use crate::config::ServiceConfig;
use crate::dem::{decode_geotiff, sample_elevation, DemError, RasterTile};
use crate::export::{export_glb, export_stl, ExportError, HeadlessContext};
use crate::geo::{
    area_acres, bounding_box, format_coordinate, Coordinate, ValidationError,
};
use crate::http::{AsyncHttpClient, FetchError};
use crate::imagery::ImageryClient;
use crate::job::{Job, JobFiles, JobStore};
use crate::mesh::{build_mesh, MeshError};

/// Errors that abort a running job.
///
/// Validation failures never reach this type; they are rejected before a
/// job exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Dem(#[from] DemError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Orchestrates terrain-generation jobs.
pub struct TerrainPipeline<C> {
    config: Arc<ServiceConfig>,
    http_client: C,
    store: Arc<dyn JobStore>,
}

impl<C> TerrainPipeline<C>
where
    C: AsyncHttpClient + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline over the given HTTP client and job store.
    pub fn new(config: ServiceConfig, http_client: C, store: Arc<dyn JobStore>) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
            store,
        }
    }

    /// Access to the job store, for status queries.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Returns the current record for a job, if known.
    pub fn status(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    /// Validates a submission and starts its background job.
    ///
    /// Returns the job id immediately; progress is observable through the
    /// store. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Rejects polygons with fewer than three vertices, submissions whose
    /// declared area exceeds the configured maximum, and polygons with
    /// vertices outside the service region. No job record is created on
    /// rejection.
    pub fn submit(
        &self,
        polygon: Vec<Coordinate>,
        declared_area_acres: f64,
    ) -> Result<String, ValidationError> {
        if polygon.len() < 3 {
            return Err(ValidationError::TooFewPoints(polygon.len()));
        }
        if declared_area_acres > self.config.max_area_acres {
            return Err(ValidationError::AreaTooLarge {
                area: declared_area_acres,
                max: self.config.max_area_acres,
            });
        }
        if let Some(outside) = polygon.iter().find(|c| !self.config.region.contains(c)) {
            return Err(ValidationError::OutsideServiceRegion(format_coordinate(
                outside,
            )));
        }

        let id = Uuid::new_v4().to_string();
        self.store.insert(Job::new(id.clone()));
        info!(job = %id, vertices = polygon.len(), "terrain job submitted");

        let config = Arc::clone(&self.config);
        let http_client = self.http_client.clone();
        let store = Arc::clone(&self.store);
        let job_id = id.clone();

        tokio::spawn(async move {
            if let Err(e) = run_job(&config, http_client, &store, &job_id, &polygon).await {
                error!(job = %job_id, error = %e, "terrain job failed");
                store.fail(&job_id, &e.to_string());
            }
        });

        Ok(id)
    }
}

/// Drives one job through every pipeline step.
async fn run_job<C: AsyncHttpClient + Clone>(
    config: &ServiceConfig,
    http_client: C,
    store: &Arc<dyn JobStore>,
    id: &str,
    polygon: &[Coordinate],
) -> Result<(), PipelineError> {
    let progress = |pct: u8, message: &str| store.set_progress(id, pct, message);

    progress(10, "Calculating area...");
    let bbox = bounding_box(polygon)?;
    debug!(job = %id, area_acres = area_acres(polygon), ?bbox, "computed bounding box");

    progress(20, "Getting imagery...");
    let imagery_client = ImageryClient::new(http_client.clone(), config.imagery.clone());
    let imagery = imagery_client.fetch(&bbox).await?;

    progress(30, "Finding DEM tiles...");
    let catalog = TileCatalog::new(http_client, config.catalog.clone());
    let all_tiles = catalog.list_candidate_tiles().await;
    info!(job = %id, tiles = all_tiles.len(), "listed DEM tiles");

    progress(35, "Filtering tiles...");
    let relevant = catalog.filter_tiles_by_region(&all_tiles, &bbox);
    if relevant.is_empty() {
        return Err(CatalogError::NoData.into());
    }

    progress(40, "Downloading DEM tiles...");
    let downloads = catalog.download_tiles(&relevant).await?;

    progress(50, "Processing elevation data...");
    let rasters: Vec<RasterTile> = downloads
        .iter()
        .filter_map(|tile| match decode_geotiff(&tile.bytes) {
            Ok(raster) => Some(raster),
            Err(e) => {
                warn!(job = %id, tile = %tile.descriptor.key, error = %e, "skipping undecodable tile");
                None
            }
        })
        .collect();
    if rasters.is_empty() {
        return Err(DemError::NoData.into());
    }
    let elevation = sample_elevation(&rasters, &bbox, config.grid_width, config.grid_height)?;

    progress(60, "Building 3D mesh...");
    let mask = config.mask_to_polygon.then_some(polygon);
    let mesh = build_mesh(
        &elevation,
        config.grid_width,
        config.grid_height,
        config.scale,
        mask,
        mask.is_some().then_some(&bbox),
    )?;
    debug!(job = %id, vertices = mesh.vertex_count(), triangles = mesh.triangle_count(), "mesh built");

    progress(70, "Preparing files...");
    let job_dir = config.output_dir.join(id);
    tokio::fs::create_dir_all(&job_dir).await?;

    progress(75, "Saving imagery...");
    tokio::fs::write(job_dir.join("snapshot.png"), &imagery).await?;
    // The viewer reads the texture from its own copy.
    tokio::fs::write(job_dir.join("texture.png"), &imagery).await?;

    progress(80, "Applying texture...");
    // The bake is validated here but detached again before export: the
    // viewer applies imagery from the separate file. A bad image is a
    // degradation, not a failure.
    match image::load_from_memory(&imagery) {
        Ok(img) => debug!(job = %id, width = img.width(), height = img.height(), "texture bake ok"),
        Err(e) => warn!(job = %id, error = %e, "texture bake failed, exporting untextured"),
    }

    progress(85, "Exporting GLB...");
    let glb = export_glb(&mesh, None, &HeadlessContext::new())?;
    tokio::fs::write(job_dir.join("terrain.glb"), &glb).await?;

    progress(90, "Exporting STL...");
    let stl = export_stl(&mesh, true);
    tokio::fs::write(job_dir.join("terrain.stl"), stl.as_bytes()).await?;

    store.complete(
        id,
        JobFiles {
            png: Some(format!("{}/{}/snapshot.png", config.public_base, id)),
            glb: Some(format!("{}/{}/terrain.glb", config.public_base, id)),
            stl: Some(format!("{}/{}/terrain.stl", config.public_base, id)),
        },
    );
    info!(job = %id, "terrain job completed");
    Ok(())
}
