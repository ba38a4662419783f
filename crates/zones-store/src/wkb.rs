//! Well-Known Binary encoding for validated geometries.
//!
//! The domain geometry is fed to geozero's WKB writer as a
//! [`GeozeroGeometry`], two-dimensional positions only. Rings are passed
//! through exactly as submitted: the store parses the bytes with
//! `ST_GeomFromWKB`, so ring closure and minimum point counts are enforced
//! there, not here.

use geozero::error::Result as GeozeroResult;
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry, ToWkb};
use zones_core::{Geometry, Ring};

use crate::error::StoreError;

/// Encode a geometry as little-endian WKB.
pub fn encode(geometry: &Geometry) -> Result<Vec<u8>, StoreError> {
    ZoneGeometry(geometry)
        .to_wkb(CoordDimensions::xy())
        .map_err(|err| StoreError::GeometryRejected {
            message: err.to_string(),
        })
}

/// Borrowed view of a domain geometry that geozero processors can walk.
struct ZoneGeometry<'a>(&'a Geometry);

impl GeozeroGeometry for ZoneGeometry<'_> {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> GeozeroResult<()> {
        match self.0 {
            Geometry::Polygon(polygon) => process_polygon(polygon.rings(), true, 0, processor),
            Geometry::MultiPolygon(multi) => {
                let polygons = multi.polygons();
                processor.multipolygon_begin(polygons.len(), 0)?;
                for (idx, rings) in polygons.iter().enumerate() {
                    process_polygon(rings, false, idx, processor)?;
                }
                processor.multipolygon_end(0)
            }
        }
    }
}

// Members of a multipolygon are untagged; the writer still emits their headers.
fn process_polygon<P: GeomProcessor>(
    rings: &[Ring],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> GeozeroResult<()> {
    processor.polygon_begin(tagged, rings.len(), idx)?;
    for (ring_idx, ring) in rings.iter().enumerate() {
        processor.linestring_begin(false, ring.len(), ring_idx)?;
        for (pos_idx, [x, y]) in ring.iter().enumerate() {
            processor.xy(*x, *y, pos_idx)?;
        }
        processor.linestring_end(false, ring_idx)?;
    }
    processor.polygon_end(tagged, idx)
}
