//! Spherical-cell encoding.
//!
//! This is a from-scratch, self-contained quantization scheme rather than
//! a binding to the real S2 geometry library: points are projected onto
//! one of six cube faces (a standard gnomonic cube projection), the
//! resulting `(i, j)` grid coordinates at the maximum level are
//! bit-interleaved (Morton/Z-order, not the true S2 Hilbert-curve
//! traversal), and a level is encoded the same way real S2 cell ids do —
//! by how many low bits are zeroed before a single sentinel `1` bit. The
//! property callers actually rely on (same cell at a given level ⇒ equal
//! token, coarser levels are prefixes of finer ones) holds for this
//! scheme; see DESIGN.md for why Hilbert-exact parity with a particular
//! S2 implementation was not attempted.

/// The finest cell granularity this encoding supports. Mirrors the real
/// S2 library's `kMaxLevel`.
pub const MAX_LEVEL: u8 = 30;

/// Smallest parent-level a range file may declare — coarser levels tile
/// too little of the globe to be a useful geofence boundary.
pub const MIN_LEVEL: u8 = 4;

/// Encodes a (possibly out-of-range) latitude/longitude pair into a leaf
/// cell id at [`MAX_LEVEL`]. Latitude is clamped to `[-90, 90]`; longitude
/// is wrapped into `(-180, 180]`.
pub fn leaf_cell(lat: f64, lon: f64) -> u64 {
    let lat = clamp_lat(lat);
    let lon = wrap_lon(lon);

    let (face, i, j) = project(lat, lon);
    let morton = interleave(i, j);

    let face_bits = (face as u64) << 61;
    // Bits 1..=60 hold the 60-bit morton position, bit 0 is the leaf
    // sentinel.
    let position = (morton << 1) | 1;
    face_bits | position
}

/// Projects `cell` (at any level, including a leaf id from [`leaf_cell`])
/// to its ancestor at `level`. `level` must be `<= MAX_LEVEL`; callers are
/// expected to have already validated it against a range file's declared
/// level (`MIN_LEVEL..=MAX_LEVEL`).
pub fn parent(cell: u64, level: u8) -> u64 {
    debug_assert!(level <= MAX_LEVEL, "level {level} exceeds MAX_LEVEL");

    let sentinel_position = 2 * (MAX_LEVEL - level) as u32;
    let face_bits = cell & (0b111u64 << 61);
    let position = cell & ((1u64 << 61) - 1);

    let keep_mask = !0u64 << (sentinel_position + 1);
    let new_position = (position & keep_mask) | (1u64 << sentinel_position);

    face_bits | new_position
}

fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

fn wrap_lon(lon: f64) -> f64 {
    let mut wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

const SIDE: u32 = 1 << MAX_LEVEL;

/// Projects a (lat, lon) in degrees onto a cube face, returning the face
/// index (0..6) and the quantized `(i, j)` grid coordinates at
/// [`MAX_LEVEL`].
fn project(lat: f64, lon: f64) -> (u8, u32, u32) {
    let lat_r = lat.to_radians();
    let lon_r = lon.to_radians();
    let cos_lat = lat_r.cos();

    let xyz = [cos_lat * lon_r.cos(), cos_lat * lon_r.sin(), lat_r.sin()];
    let abs = xyz.map(f64::abs);

    let axis = if abs[0] >= abs[1] && abs[0] >= abs[2] {
        0
    } else if abs[1] >= abs[2] {
        1
    } else {
        2
    };

    let major = xyz[axis];
    // Only the origin (lat/lon undefined direction) can make `major` zero;
    // treat it as the positive face for that axis.
    let sign_positive = major >= 0.0;
    let face = (axis * 2 + usize::from(!sign_positive)) as u8;

    let denom = if major == 0.0 { 1.0 } else { major };
    let other1 = xyz[(axis + 1) % 3];
    let other2 = xyz[(axis + 2) % 3];
    let u = (other1 / denom).clamp(-1.0, 1.0);
    let v = (other2 / denom).clamp(-1.0, 1.0);

    let s = 0.5 * (u + 1.0);
    let t = 0.5 * (v + 1.0);

    let i = ((s * f64::from(SIDE)) as u32).min(SIDE - 1);
    let j = ((t * f64::from(SIDE)) as u32).min(SIDE - 1);

    (face, i, j)
}

/// Interleaves the low 30 bits of `i` and `j` into a 60-bit Morton code,
/// with `i`'s bits at even positions and `j`'s at odd positions.
fn interleave(i: u32, j: u32) -> u64 {
    let mut result: u64 = 0;
    for bit in 0..MAX_LEVEL {
        result |= (u64::from(i >> bit) & 1) << (2 * bit);
        result |= (u64::from(j >> bit) & 1) << (2 * bit + 1);
    }
    result
}
