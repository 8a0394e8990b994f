//! The graph6 text encoding used by nauty/geng corpora.
//!
//! A graph6 string is a size header followed by the upper triangle of the
//! adjacency matrix in column order (`(0,1), (0,2), (1,2), (0,3), ...`), packed
//! six bits per printable byte (value `+ 63`, most significant bit first).

use crate::error::GraphError;
use crate::graph::{bit, Graph, MAX_VERTICES};

/// Optional header some tools prepend to graph6 files.
const HEADER: &str = ">>graph6<<";

/// Marker byte introducing a multi-byte order.
const LONG_ORDER: u8 = 126;

const BIAS: u8 = 63;

#[inline]
fn invalid(position: usize, reason: &'static str) -> GraphError {
    GraphError::Graph6 { position, reason }
}

/// Decodes a single graph6 string.
///
/// Surrounding whitespace and a leading `>>graph6<<` header are ignored.
///
/// # Errors
/// Returns [`GraphError::Graph6`] for malformed input and
/// [`GraphError::TooManyVertices`] for graphs with more than 64 vertices.
pub fn parse_graph6(text: &str) -> Result<Graph, GraphError> {
    let text = text.trim();
    let text = text.strip_prefix(HEADER).unwrap_or(text);
    let bytes = text.as_bytes();

    if bytes.is_empty() {
        return Err(invalid(0, "empty input"));
    }
    if let Some(pos) = bytes.iter().position(|b| !(BIAS..=LONG_ORDER).contains(b)) {
        return Err(invalid(pos, "byte outside the printable range 63..=126"));
    }

    let (n, header_len) = if bytes[0] == LONG_ORDER {
        if bytes.get(1) == Some(&LONG_ORDER) {
            return Err(invalid(1, "orders above 258047 are not supported"));
        }
        if bytes.len() < 4 {
            return Err(invalid(bytes.len(), "truncated order header"));
        }
        let n = (usize::from(bytes[1] - BIAS) << 12)
            | (usize::from(bytes[2] - BIAS) << 6)
            | usize::from(bytes[3] - BIAS);
        (n, 4)
    } else {
        (usize::from(bytes[0] - BIAS), 1)
    };

    if n > MAX_VERTICES {
        return Err(GraphError::TooManyVertices { n });
    }

    let pairs = n * n.saturating_sub(1) / 2;
    let body = &bytes[header_len..];
    if body.len() != pairs.div_ceil(6) {
        return Err(invalid(header_len, "body length does not match the order"));
    }

    let mut rows = vec![0u64; n];
    let mut idx = 0usize;
    for j in 1..n {
        for i in 0..j {
            let chunk = body[idx / 6] - BIAS;
            if (chunk >> (5 - idx % 6)) & 1 == 1 {
                rows[i] |= bit(j);
                rows[j] |= bit(i);
            }
            idx += 1;
        }
    }

    let padding = body.len() * 6 - pairs;
    if padding > 0 {
        let last = body[body.len() - 1] - BIAS;
        if last & ((1u8 << padding) - 1) != 0 {
            return Err(invalid(bytes.len() - 1, "non-zero padding bits"));
        }
    }

    Ok(Graph::from_rows_unchecked(rows))
}

/// Encodes a graph as a graph6 string (no header, no trailing newline).
pub fn to_graph6(graph: &Graph) -> String {
    let n = graph.order();
    let pairs = n * n.saturating_sub(1) / 2;
    let mut out: Vec<u8> = Vec::with_capacity(4 + pairs.div_ceil(6));

    if n < usize::from(LONG_ORDER - BIAS) {
        out.push(n as u8 + BIAS);
    } else {
        out.push(LONG_ORDER);
        out.push(((n >> 12) & 0x3F) as u8 + BIAS);
        out.push(((n >> 6) & 0x3F) as u8 + BIAS);
        out.push((n & 0x3F) as u8 + BIAS);
    }

    let mut chunk = 0u8;
    let mut filled = 0u32;
    for j in 1..n {
        for i in 0..j {
            chunk = (chunk << 1) | u8::from(graph.has_edge(i, j));
            filled += 1;
            if filled == 6 {
                out.push(chunk + BIAS);
                chunk = 0;
                filled = 0;
            }
        }
    }
    if filled > 0 {
        out.push((chunk << (6 - filled)) + BIAS);
    }

    out.into_iter().map(char::from).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    #[test]
    fn complete_graph_k4_is_c_tilde() {
        let k4 = construction::complete(4).unwrap();
        assert_eq!(to_graph6(&k4), "C~");
        assert_eq!(parse_graph6("C~").unwrap(), k4);
    }

    #[test]
    fn known_small_encodings() {
        let c5 = construction::cycle(5).unwrap();
        assert_eq!(to_graph6(&c5), "Dhc");
        assert_eq!(to_graph6(&construction::complete(3).unwrap()), "Bw");
        assert_eq!(to_graph6(&Graph::empty(0).unwrap()), "?");
        assert_eq!(to_graph6(&Graph::empty(1).unwrap()), "@");
    }

    #[test]
    fn empty_and_singleton_decode() {
        assert_eq!(parse_graph6("?").unwrap().order(), 0);
        assert_eq!(parse_graph6("@").unwrap().order(), 1);
    }

    #[test]
    fn header_and_whitespace_are_tolerated() {
        let g = parse_graph6("  >>graph6<<Dhc\n").unwrap();
        assert_eq!(g, construction::cycle(5).unwrap());
    }

    #[test]
    fn long_order_header_roundtrip() {
        let g = construction::cycle(64).unwrap();
        let s = to_graph6(&g);
        assert_eq!(s.as_bytes()[0], LONG_ORDER);
        assert_eq!(parse_graph6(&s).unwrap(), g);

        let g = construction::path(63).unwrap();
        assert_eq!(parse_graph6(&to_graph6(&g)).unwrap(), g);
    }

    #[test]
    fn random_graphs_roundtrip() {
        let mut rng = XorShiftRng::seed_from_u64(0x6A6);
        for n in 0..=40 {
            let g = construction::random(n, rng.random_range(0.1..0.9), &mut rng).unwrap();
            let s = to_graph6(&g);
            assert_eq!(parse_graph6(&s).unwrap(), g, "n={n}");
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(parse_graph6("   "), Err(GraphError::Graph6 { position: 0, .. })));
    }

    #[test]
    fn rejects_bytes_outside_range() {
        assert!(matches!(parse_graph6("C!"), Err(GraphError::Graph6 { position: 1, .. })));
    }

    #[test]
    fn rejects_wrong_body_length() {
        assert!(matches!(parse_graph6("C~~"), Err(GraphError::Graph6 { .. })));
        assert!(matches!(parse_graph6("D"), Err(GraphError::Graph6 { .. })));
    }

    #[test]
    fn rejects_non_zero_padding() {
        // n = 5 has 10 pair bits, so the last two bits of the second byte are padding.
        assert!(matches!(parse_graph6("Dhd"), Err(GraphError::Graph6 { .. })));
    }

    #[test]
    fn rejects_too_many_vertices() {
        // 126, then order 65 = 0b000001_000001 encoded in three bytes.
        let mut s = String::from("~?@@");
        s.push_str(&"?".repeat((65 * 64 / 2usize).div_ceil(6)));
        assert_eq!(parse_graph6(&s).unwrap_err(), GraphError::TooManyVertices { n: 65 });
    }
}
