//! Assemble polygons from line work
//!
//! OSM exports water bodies as ways: a small lake is one closed way, a
//! large reservoir is often several open ways sharing end nodes. Closed
//! ways become polygons directly; open ways are chained end-to-end (either
//! direction) until they close. Chains that never close are discarded.

use geo::{ConvexHull, Coord, LineString, Polygon};

/// How assembled rings are turned into polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonizeMode {
    /// Keep each ring as traced
    #[default]
    Exact,
    /// Replace each ring by its convex hull
    ConvexHull,
}

/// Build polygons from closed and chainable line strings
pub fn polygonize(lines: &[LineString<f64>], mode: PolygonizeMode) -> Vec<Polygon<f64>> {
    let mut rings: Vec<Vec<Coord<f64>>> = Vec::new();
    let mut open: Vec<Vec<Coord<f64>>> = Vec::new();

    for line in lines.iter().filter(|l| l.0.len() >= 2) {
        if line.is_closed() {
            rings.push(line.0.clone());
        } else {
            open.push(line.0.clone());
        }
    }

    while let Some(mut chain) = open.pop() {
        loop {
            if is_closed(&chain) {
                rings.push(chain);
                break;
            }
            let Some(pos) = open.iter().position(|l| touches_end(&chain, l)) else {
                break;
            };
            let mut next = open.swap_remove(pos);
            let end = chain[chain.len() - 1];
            if next[0] != end {
                next.reverse();
            }
            chain.extend(next.into_iter().skip(1));
        }
    }

    rings
        .into_iter()
        .filter(|ring| ring.len() >= 4)
        .map(|ring| {
            let polygon = Polygon::new(LineString::new(ring), vec![]);
            match mode {
                PolygonizeMode::Exact => polygon,
                PolygonizeMode::ConvexHull => polygon.convex_hull(),
            }
        })
        .collect()
}

fn is_closed(chain: &[Coord<f64>]) -> bool {
    chain.len() >= 4 && chain.first() == chain.last()
}

fn touches_end(chain: &[Coord<f64>], line: &[Coord<f64>]) -> bool {
    match (chain.last(), line.first(), line.last()) {
        (Some(end), Some(first), Some(last)) => end == first || end == last,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, Area};

    #[test]
    fn test_closed_way() {
        let way = line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 0.0)];
        let polygons = polygonize(&[way], PolygonizeMode::Exact);
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].unsigned_area() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_chained_ways_in_both_directions() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0)];
        // Stored backwards relative to `a`
        let b = line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 2.0), (x: 2.0, y: 2.0)];
        let polygons = polygonize(&[a, b], PolygonizeMode::Exact);
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_way_is_dropped() {
        let dangling = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(polygonize(&[dangling], PolygonizeMode::Exact).is_empty());
    }

    #[test]
    fn test_convex_hull_mode_fills_concavity() {
        // L-shaped ring of area 3
        let l_shape = line_string![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0),
            (x: 1.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0)
        ];
        let exact = polygonize(&[l_shape.clone()], PolygonizeMode::Exact);
        let hull = polygonize(&[l_shape], PolygonizeMode::ConvexHull);
        assert!((exact[0].unsigned_area() - 3.0).abs() < 1e-12);
        assert!((hull[0].unsigned_area() - 3.5).abs() < 1e-12);
    }
}
