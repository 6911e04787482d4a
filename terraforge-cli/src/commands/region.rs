//! Region command - print the supported coverage area.

use terraforge::ServiceConfig;

use crate::error::CliError;

/// Run the region command.
pub fn run() -> Result<(), CliError> {
    let config = ServiceConfig::default();
    let region = config.region;

    println!("Service region:");
    println!("  Latitude:  {:.4} to {:.4}", region.min_lat, region.max_lat);
    println!("  Longitude: {:.4} to {:.4}", region.min_lng, region.max_lng);
    println!("Maximum polygon area: {:.0} acres", config.max_area_acres);
    Ok(())
}
