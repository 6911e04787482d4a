//! Single-band GeoTIFF decoding.
//!
//! Reads the elevation band plus the georeferencing tags this pipeline
//! needs: ModelPixelScale + ModelTiepoint for the extent, the GeoKey
//! directory for units, and GDAL_NODATA for the sentinel value. Full GeoTIFF
//! CRS resolution is out of scope; the CRS kind is inferred from coordinate
//! magnitude.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use super::{CrsKind, DemError, LengthUnit, RasterBounds, RasterTile};

/// GeoKey id for the projected linear unit.
const PROJ_LINEAR_UNITS_KEY: u16 = 3076;

/// GeoKey id for the vertical (elevation) unit.
const VERTICAL_UNITS_KEY: u16 = 4099;

/// EPSG unit code for the meter.
const UNIT_METER: u16 = 9001;

/// EPSG unit codes for international and US survey feet.
const UNIT_FOOT: u16 = 9002;
const UNIT_US_SURVEY_FOOT: u16 = 9003;

/// Decodes a single-band elevation GeoTIFF.
///
/// # Errors
///
/// Fails when the container is not a TIFF, the band's sample format is
/// unsupported, or the georeferencing tags are absent.
pub fn decode_geotiff(bytes: &[u8]) -> Result<RasterTile, DemError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;

    let pixel_scale = read_f64_vec(&mut decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = read_f64_vec(&mut decoder, Tag::ModelTiepointTag)?;

    let (scale, tie) = match (pixel_scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 5 => (s, t),
        _ => return Err(DemError::MissingGeoreference),
    };

    // Tiepoint maps raster (i, j) to world (x, y); production tiles anchor
    // the top-left corner, so offset by the pixel indices to be safe.
    let origin_x = tie[3] - tie[0] * scale[0];
    let origin_y = tie[4] + tie[1] * scale[1];

    let bounds = RasterBounds {
        min_x: origin_x,
        min_y: origin_y - height as f64 * scale[1],
        max_x: origin_x + width as f64 * scale[0],
        max_y: origin_y,
    };

    let crs = if bounds.min_x.abs() > 180.0
        || bounds.max_x.abs() > 180.0
        || bounds.min_y.abs() > 90.0
        || bounds.max_y.abs() > 90.0
    {
        CrsKind::Projected
    } else {
        CrsKind::Geographic
    };

    let geo_keys = read_u16_vec(&mut decoder, Tag::GeoKeyDirectoryTag)?.unwrap_or_default();
    let linear_unit = unit_from_geo_keys(&geo_keys, PROJ_LINEAR_UNITS_KEY)
        .unwrap_or(LengthUnit::Meters);
    // Vertical unit defaults to the linear unit: State Plane DEM products
    // ship both in survey feet.
    let elevation_unit =
        unit_from_geo_keys(&geo_keys, VERTICAL_UNITS_KEY).unwrap_or(linear_unit);

    let nodata = read_string(&mut decoder, Tag::GdalNodata)?
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f32>().ok());

    let data = match decoder.read_image()? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        _ => return Err(DemError::UnsupportedSampleFormat),
    };

    if data.len() != (width as usize) * (height as usize) {
        // Multi-band rasters decode to interleaved data; this pipeline only
        // handles single-band elevation products.
        return Err(DemError::UnsupportedSampleFormat);
    }

    debug!(
        width,
        height,
        ?crs,
        ?elevation_unit,
        nodata = ?nodata,
        "decoded DEM tile"
    );

    Ok(RasterTile {
        data,
        width,
        height,
        bounds,
        crs,
        linear_unit,
        elevation_unit,
        nodata,
    })
}

fn read_f64_vec(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, DemError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_u16_vec(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    tag: Tag,
) -> Result<Option<Vec<u16>>, DemError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u16_vec()?)),
        None => Ok(None),
    }
}

fn read_string(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    tag: Tag,
) -> Result<Option<String>, DemError> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_string()?)),
        None => Ok(None),
    }
}

/// Looks up a unit GeoKey in the flattened key directory.
///
/// The directory is a header of four u16s followed by 4-u16 entries of
/// (key id, tag location, count, value).
fn unit_from_geo_keys(geo_keys: &[u16], key_id: u16) -> Option<LengthUnit> {
    geo_keys
        .get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key_id)
        .and_then(|entry| match entry[3] {
            UNIT_METER => Some(LengthUnit::Meters),
            UNIT_FOOT | UNIT_US_SURVEY_FOOT => Some(LengthUnit::Feet),
            _ => None,
        })
}
