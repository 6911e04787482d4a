//! Aerial imagery fetching from a WMS GetMap service.
//!
//! The imagery request geometry is decoupled from the user's polygon: a
//! square-ish bounding box is derived from the polygon *center* and a fixed
//! ground resolution. Arbitrarily thin or skewed polygons otherwise produce
//! degenerate GetMap requests, which is the dominant failure mode of using
//! the raw bounding box.
//!
//! Malformed service responses never fail the job: a non-image body or an
//! implausibly small image is replaced by a deterministic solid-color
//! placeholder. Only transport errors propagate.

use std::io::Cursor;

use image::{ImageBuffer, Rgb};
use tracing::{debug, warn};

use crate::config::ImageryConfig;
use crate::geo::BoundingBox;
use crate::http::{AsyncHttpClient, FetchError};

/// Meters per degree of longitude at the equator.
const METERS_PER_DEGREE_LON: f64 = 111_320.0;

/// Meters per degree of latitude.
const METERS_PER_DEGREE_LAT: f64 = 110_574.0;

/// Fallback texture color (tan), used when the service returns no image.
const FALLBACK_COLOR: Rgb<u8> = Rgb([0xD2, 0xB4, 0x8C]);

/// Computes a resolution-safe imagery bounding box.
///
/// The box is centered on the input box's center; its degree span is derived
/// from the fixed ground resolution and pixel dimensions, independent of the
/// input's width or height:
///
/// ```text
/// deg_lon = (mpp * width)  / (111320 * cos(center_lat * PI / 180))
/// deg_lat = (mpp * height) / 110574
/// ```
pub fn safe_image_bbox(
    bbox: &BoundingBox,
    pixel_width: u32,
    pixel_height: u32,
    meters_per_pixel: f64,
) -> BoundingBox {
    let center = bbox.center();

    let span_x = meters_per_pixel * pixel_width as f64;
    let span_y = meters_per_pixel * pixel_height as f64;

    let deg_lon = span_x / (METERS_PER_DEGREE_LON * (center.lat.to_radians()).cos());
    let deg_lat = span_y / METERS_PER_DEGREE_LAT;

    BoundingBox {
        min_lat: center.lat - deg_lat / 2.0,
        max_lat: center.lat + deg_lat / 2.0,
        min_lng: center.lng - deg_lon / 2.0,
        max_lng: center.lng + deg_lon / 2.0,
    }
}

/// Encodes a solid-color placeholder PNG of the requested size.
///
/// Deterministic for identical dimensions; used when the imagery service
/// returns something other than a usable image.
pub fn fallback_texture(width: u32, height: u32) -> Vec<u8> {
    let buffer = ImageBuffer::from_pixel(width, height, FALLBACK_COLOR);
    let mut bytes = Cursor::new(Vec::new());

    // Encoding an RGB8 buffer to PNG cannot fail on an in-memory writer.
    image::DynamicImage::ImageRgb8(buffer)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("in-memory PNG encoding");

    bytes.into_inner()
}

/// WMS imagery client.
///
/// Issues GetMap requests against an ArcGIS ImageServer WMS endpoint and
/// applies the fallback policy described in the module docs.
pub struct ImageryClient<C: AsyncHttpClient> {
    http_client: C,
    config: ImageryConfig,
}

impl<C: AsyncHttpClient> ImageryClient<C> {
    /// Creates a new imagery client.
    pub fn new(http_client: C, config: ImageryConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Builds the GetMap URL for the given bounding box.
    ///
    /// WMS 1.1.1 orders the BBOX parameter minx,miny,maxx,maxy, i.e.
    /// lng before lat.
    fn build_url(&self, bbox: &BoundingBox) -> String {
        format!(
            "{}?SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap&LAYERS={}&FORMAT=image%2Fpng&TRANSPARENT=true&SRS=EPSG%3A4326&BBOX={},{},{},{}&WIDTH={}&HEIGHT={}",
            self.config.endpoint,
            self.config.layers,
            bbox.min_lng,
            bbox.min_lat,
            bbox.max_lng,
            bbox.max_lat,
            self.config.width,
            self.config.height,
        )
    }

    /// Fetches imagery for the polygon bounding box.
    ///
    /// The request uses [`safe_image_bbox`], not `bbox` itself. A response
    /// that is not an image, or whose body is implausibly small for the
    /// requested resolution, degrades to [`fallback_texture`] with a logged
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only for transport failures.
    pub async fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<u8>, FetchError> {
        let request_bbox = safe_image_bbox(
            bbox,
            self.config.width,
            self.config.height,
            self.config.meters_per_pixel,
        );
        let url = self.build_url(&request_bbox);
        debug!(url = %url, "requesting WMS imagery");

        let response = self.http_client.get(&url).await?;

        if !response.is_image() {
            warn!(
                content_type = ?response.content_type,
                "WMS returned non-image response, using fallback texture"
            );
            return Ok(fallback_texture(self.config.width, self.config.height));
        }

        // A valid aerial image of this resolution is far larger than this
        // floor; anything below it is an empty or transparent tile.
        let min_plausible = (self.config.width as usize * self.config.height as usize) / 100;
        if response.body.len() < min_plausible {
            warn!(
                bytes = response.body.len(),
                floor = min_plausible,
                "WMS image implausibly small, using fallback texture"
            );
            return Ok(fallback_texture(self.config.width, self.config.height));
        }

        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockAsyncHttpClient;

    fn thin_bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 30.27,
            max_lat: 30.2701,
            min_lng: -97.80,
            max_lng: -97.70,
        }
    }

    fn square_bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 30.22,
            max_lat: 30.32,
            min_lng: -97.80,
            max_lng: -97.70,
        }
    }

    #[test]
    fn test_safe_bbox_span_independent_of_shape() {
        // Same center, very different shapes: the derived spans must match.
        let a = safe_image_bbox(&thin_bbox(), 1024, 1024, 0.35);
        let b = safe_image_bbox(
            &BoundingBox {
                min_lat: 30.27,
                max_lat: 30.2701,
                min_lng: -97.7501,
                max_lng: -97.75,
            },
            1024,
            1024,
            0.35,
        );

        assert!((a.width_deg() - b.width_deg()).abs() < 1e-12);
        assert!((a.height_deg() - b.height_deg()).abs() < 1e-12);
    }

    #[test]
    fn test_safe_bbox_centered_on_input() {
        let bbox = square_bbox();
        let safe = safe_image_bbox(&bbox, 1024, 1024, 0.35);

        let center = bbox.center();
        let safe_center = safe.center();
        assert!((center.lat - safe_center.lat).abs() < 1e-12);
        assert!((center.lng - safe_center.lng).abs() < 1e-12);

        // 1024 px at 0.35 m/px is ~358 m, i.e. a few thousandths of a degree.
        assert!(safe.height_deg() > 0.002 && safe.height_deg() < 0.005);
    }

    #[test]
    fn test_fallback_texture_is_png() {
        let bytes = fallback_texture(32, 32);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        // Deterministic across calls.
        assert_eq!(bytes, fallback_texture(32, 32));
    }

    #[tokio::test]
    async fn test_fetch_returns_body_for_image_response() {
        let body = vec![0u8; 50_000];
        let mock = MockAsyncHttpClient::new().on_ok("GetMap", "image/png", body.clone());
        let client = ImageryClient::new(mock, ImageryConfig::default());

        let result = client.fetch(&square_bbox()).await.unwrap();
        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_on_non_image() {
        let mock = MockAsyncHttpClient::new().on_ok(
            "GetMap",
            "text/xml",
            b"<ServiceException>oops</ServiceException>".to_vec(),
        );
        let client = ImageryClient::new(mock, ImageryConfig::default());

        let result = client.fetch(&square_bbox()).await.unwrap();
        assert_eq!(&result[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn test_fetch_falls_back_on_tiny_image() {
        let mock = MockAsyncHttpClient::new().on_ok("GetMap", "image/png", vec![0u8; 64]);
        let client = ImageryClient::new(mock, ImageryConfig::default());

        let result = client.fetch(&square_bbox()).await.unwrap();
        // The 64-byte body is below the plausibility floor for 1024x1024.
        assert!(result.len() > 64);
        assert_eq!(&result[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn test_fetch_propagates_transport_errors() {
        let mock = MockAsyncHttpClient::new();
        let client = ImageryClient::new(mock, ImageryConfig::default());

        let result = client.fetch(&square_bbox()).await;
        assert!(result.is_err());
    }
}
