use crate::address;
use crate::fixed::Fixed;
use crate::mem::{MemError, MemoryPort};
use crate::ConfigError;

/// Fractional bits of the sampler's fixed-point coordinate domain.
pub const TEX_FRAC_BITS: u32 = 16;

/// Number of addressable mip levels in the register file.
pub const MAX_MIP_LEVELS: usize = 16;

pub const NUM_STATE_REGS: usize = 7 + MAX_MIP_LEVELS;

type Coord = Fixed<TEX_FRAC_BITS>;

/// Texture state register file layout.
///
/// A closed enumeration: these indices are the ABI between the decode
/// layer and the sampler and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReg {
    /// base physical address of mip level 0
    Addr,
    /// log2 width at mip 0
    Width,
    /// log2 height at mip 0
    Height,
    /// texel encoding, see [`TexFormat`]
    Format,
    /// see [`FilterMode`]
    Filter,
    /// horizontal edge policy, see [`WrapMode`]
    WrapU,
    /// vertical edge policy, see [`WrapMode`]
    WrapV,
    /// byte offset of one mip level relative to the base address
    MipOff(usize),
}

impl StateReg {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            StateReg::Addr => 0,
            StateReg::Width => 1,
            StateReg::Height => 2,
            StateReg::Format => 3,
            StateReg::Filter => 4,
            StateReg::WrapU => 5,
            StateReg::WrapV => 6,
            StateReg::MipOff(lod) => 7 + lod,
        }
    }
}

/// Texel encodings and their byte strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u32)]
pub enum TexFormat {
    R8G8B8A8 = 0,
    R5G6B5,
    A1R5G5B5,
    A4R4G4B4,
    A8L8,
    L8,
    A8,
}

impl TexFormat {
    /// Byte size of one texel.
    #[must_use]
    pub const fn stride(self) -> u32 {
        match self {
            TexFormat::R8G8B8A8 => 4,
            TexFormat::R5G6B5
            | TexFormat::A1R5G5B5
            | TexFormat::A4R4G4B4
            | TexFormat::A8L8 => 2,
            TexFormat::L8 | TexFormat::A8 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u32)]
pub enum FilterMode {
    Point = 0,
    Bilinear,
    /// Declared in the ABI but not a supported read path.
    Trilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u32)]
pub enum WrapMode {
    Clamp = 0,
    Wrap,
    Mirror,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mem(#[from] MemError),
}

/// Texture unit register bank.
///
/// A bounds-checked key-value store over a fixed-size array: the single
/// seam between the decode layer and the sampler.
#[derive(Debug, Default, Clone)]
pub struct TexState {
    regs: [u32; NUM_STATE_REGS],
}

impl TexState {
    pub fn get_state(&self, index: u32) -> Result<u32, ConfigError> {
        self.regs
            .get(index as usize)
            .copied()
            .ok_or(ConfigError::InvalidStateRegister { index })
    }

    pub fn set_state(&mut self, index: u32, value: u32) -> Result<(), ConfigError> {
        *self
            .regs
            .get_mut(index as usize)
            .ok_or(ConfigError::InvalidStateRegister { index })? = value;
        Ok(())
    }

    fn reg(&self, reg: StateReg) -> Result<u32, ConfigError> {
        self.get_state(reg.index() as u32)
    }

    fn decode<T>(&self, reg: StateReg, what: &'static str, f: impl Fn(u32) -> Option<T>) -> Result<T, ConfigError> {
        let value = self.reg(reg)?;
        f(value).ok_or(ConfigError::InvalidEnum { what, value })
    }
}

/// Reduce an integer texel coordinate into `[0, 2^log_dim)`.
fn wrap_coord(x: i32, log_dim: u32, mode: WrapMode) -> u32 {
    let dim = 1i32 << log_dim;
    match mode {
        WrapMode::Clamp => x.clamp(0, dim - 1) as u32,
        WrapMode::Wrap => (x & (dim - 1)) as u32,
        WrapMode::Mirror => {
            let period = 2 * dim;
            let m = x & (period - 1);
            if m < dim { m as u32 } else { (period - 1 - m) as u32 }
        }
    }
}

/// Scale a normalized coordinate to the texel grid of a `2^log_dim`
/// wide axis, keeping the fractional bits.
fn scale_coord(coord: Coord, log_dim: u32) -> Coord {
    Coord::from_raw(coord.raw().wrapping_shl(log_dim))
}

/// Single-tap texel offset for point sampling.
fn address_point(
    u: Coord,
    v: Coord,
    log_width: u32,
    log_height: u32,
    wrap_u: WrapMode,
    wrap_v: WrapMode,
) -> u32 {
    let x = wrap_coord(scale_coord(u, log_width).floor(), log_width, wrap_u);
    let y = wrap_coord(scale_coord(v, log_height).floor(), log_height, wrap_v);
    (y << log_width) + x
}

/// 2x2 footprint around the half-texel-centered coordinate, plus the
/// horizontal (`alpha`) and vertical (`beta`) blend fractions.
///
/// The wrap policy applies to each integer tap independently, so a
/// footprint straddling a seam filters correctly.
fn address_bilinear(
    u: Coord,
    v: Coord,
    log_width: u32,
    log_height: u32,
    wrap_u: WrapMode,
    wrap_v: WrapMode,
) -> ([u32; 4], i32, i32) {
    let su = scale_coord(u, log_width) - Coord::from_raw(Coord::HALF);
    let sv = scale_coord(v, log_height) - Coord::from_raw(Coord::HALF);

    let ix = su.floor();
    let iy = sv.floor();
    let alpha = su.frac();
    let beta = sv.frac();

    let x0 = wrap_coord(ix, log_width, wrap_u);
    let x1 = wrap_coord(ix + 1, log_width, wrap_u);
    let y0 = wrap_coord(iy, log_height, wrap_v);
    let y1 = wrap_coord(iy + 1, log_height, wrap_v);

    let offsets = [
        (y0 << log_width) + x0,
        (y0 << log_width) + x1,
        (y1 << log_width) + x0,
        (y1 << log_width) + x1,
    ];
    (offsets, alpha, beta)
}

/// 8-bit RGBA channels of one decoded texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Color {
    r: u32,
    g: u32,
    b: u32,
    a: u32,
}

const fn expand5(x: u32) -> u32 {
    (x << 3) | (x >> 2)
}

const fn expand6(x: u32) -> u32 {
    (x << 2) | (x >> 4)
}

const fn expand4(x: u32) -> u32 {
    (x << 4) | x
}

fn decode_texel(format: TexFormat, texel: u32) -> Color {
    match format {
        TexFormat::R8G8B8A8 => Color {
            r: texel & 0xff,
            g: (texel >> 8) & 0xff,
            b: (texel >> 16) & 0xff,
            a: (texel >> 24) & 0xff,
        },
        TexFormat::R5G6B5 => Color {
            r: expand5((texel >> 11) & 0x1f),
            g: expand6((texel >> 5) & 0x3f),
            b: expand5(texel & 0x1f),
            a: 0xff,
        },
        TexFormat::A1R5G5B5 => Color {
            r: expand5((texel >> 10) & 0x1f),
            g: expand5((texel >> 5) & 0x1f),
            b: expand5(texel & 0x1f),
            a: 0xff * ((texel >> 15) & 0x1),
        },
        TexFormat::A4R4G4B4 => Color {
            r: expand4((texel >> 8) & 0xf),
            g: expand4((texel >> 4) & 0xf),
            b: expand4(texel & 0xf),
            a: expand4((texel >> 12) & 0xf),
        },
        TexFormat::A8L8 => {
            let l = texel & 0xff;
            Color {
                r: l,
                g: l,
                b: l,
                a: (texel >> 8) & 0xff,
            }
        }
        TexFormat::L8 => {
            let l = texel & 0xff;
            Color {
                r: l,
                g: l,
                b: l,
                a: 0xff,
            }
        }
        TexFormat::A8 => Color {
            r: 0,
            g: 0,
            b: 0,
            a: texel & 0xff,
        },
    }
}

/// Pack 8-bit channels into the canonical `R8G8B8A8` word.
const fn pack_color(color: Color) -> u32 {
    color.r | (color.g << 8) | (color.b << 16) | (color.a << 24)
}

/// Linear interpolation with a `TEX_FRAC_BITS`-bit weight.
///
/// `w = 0` yields exactly `a`.
fn lerp(a: u32, b: u32, w: i32) -> u32 {
    let delta = ((i64::from(b) - i64::from(a)) * i64::from(w)) >> TEX_FRAC_BITS;
    (i64::from(a) + delta) as u32
}

fn filter_point(format: TexFormat, texel: u32) -> u32 {
    pack_color(decode_texel(format, texel))
}

fn filter_bilinear(
    format: TexFormat,
    texels: [u32; 4],
    alpha: i32,
    beta: i32,
) -> u32 {
    let [c00, c01, c10, c11] = texels.map(|texel| decode_texel(format, texel));
    let blend = |c00: u32, c01: u32, c10: u32, c11: u32| {
        lerp(lerp(c00, c01, alpha), lerp(c10, c11, alpha), beta)
    };
    pack_color(Color {
        r: blend(c00.r, c01.r, c10.r, c11.r),
        g: blend(c00.g, c01.g, c10.g, c11.g),
        b: blend(c00.b, c01.b, c10.b, c11.b),
        a: blend(c00.a, c01.a, c10.a, c11.a),
    })
}

/// Texture sampling unit.
///
/// Turns a fixed-point `(u, v, lod)` coordinate into cache-routed
/// memory reads and a filtered color, recording every byte address it
/// touches for the caller's traffic model.
#[derive(Debug, Default, Clone)]
pub struct TexUnit {
    state: TexState,
}

impl TexUnit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_state(&self, index: u32) -> Result<u32, ConfigError> {
        self.state.get_state(index)
    }

    pub fn set_state(&mut self, index: u32, value: u32) -> Result<(), ConfigError> {
        self.state.set_state(index, value)
    }

    /// Sample the texture at `(u, v)` on mip level `lod`.
    ///
    /// `u` and `v` are normalized coordinates in the unit's fixed-point
    /// scale. Every byte address read is appended to `mem_addrs` in
    /// emission order. `lod` is the caller's responsibility; only the
    /// derived dimension logs are clamped.
    pub fn read(
        &self,
        port: &mut dyn MemoryPort,
        u: i32,
        v: i32,
        lod: u32,
        mem_addrs: &mut Vec<address>,
    ) -> Result<u32, TexError> {
        let xu = Coord::from_raw(u);
        let xv = Coord::from_raw(v);
        let base_addr = self
            .state
            .reg(StateReg::Addr)?
            .wrapping_add(self.state.reg(StateReg::MipOff(lod as usize))?);
        let log_width = self.state.reg(StateReg::Width)?.saturating_sub(lod);
        let log_height = self.state.reg(StateReg::Height)?.saturating_sub(lod);
        let format = self
            .state
            .decode(StateReg::Format, "texture format", TexFormat::from_repr)?;
        let filter = self
            .state
            .decode(StateReg::Filter, "filter mode", FilterMode::from_repr)?;
        let wrap_u = self
            .state
            .decode(StateReg::WrapU, "wrap mode", WrapMode::from_repr)?;
        let wrap_v = self
            .state
            .decode(StateReg::WrapV, "wrap mode", WrapMode::from_repr)?;

        let stride = format.stride();

        match filter {
            FilterMode::Bilinear => {
                // addressing
                let (offsets, alpha, beta) =
                    address_bilinear(xu, xv, log_width, log_height, wrap_u, wrap_v);
                let addrs = offsets.map(|offset| address::from(base_addr) + u64::from(offset * stride));

                // memory lookup
                let mut texels = [0u32; 4];
                for (texel, &addr) in texels.iter_mut().zip(&addrs) {
                    *texel = port.read_u32(addr, stride)?;
                    mem_addrs.push(addr);
                }

                // filtering
                Ok(filter_bilinear(format, texels, alpha, beta))
            }
            FilterMode::Point => {
                // addressing
                let offset = address_point(xu, xv, log_width, log_height, wrap_u, wrap_v);
                let addr = address::from(base_addr) + u64::from(offset * stride);

                // memory lookup
                let texel = port.read_u32(addr, stride)?;
                mem_addrs.push(addr);

                // filtering
                Ok(filter_point(format, texel))
            }
            FilterMode::Trilinear => {
                Err(ConfigError::UnsupportedFilter { mode: filter }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        address_bilinear, wrap_coord, Coord, FilterMode, StateReg, TexFormat, TexUnit, WrapMode,
        NUM_STATE_REGS,
    };
    use crate::mem::Ram;
    use crate::ConfigError;

    /// 4x4 RGBA8 texture at 0x1000, point filtering, clamp on both axes.
    fn rgba_unit(filter: FilterMode) -> TexUnit {
        let mut unit = TexUnit::new();
        unit.set_state(StateReg::Addr.index() as u32, 0x1000).unwrap();
        unit.set_state(StateReg::Width.index() as u32, 2).unwrap();
        unit.set_state(StateReg::Height.index() as u32, 2).unwrap();
        unit.set_state(StateReg::Format.index() as u32, TexFormat::R8G8B8A8 as u32)
            .unwrap();
        unit.set_state(StateReg::Filter.index() as u32, filter as u32)
            .unwrap();
        unit.set_state(StateReg::WrapU.index() as u32, WrapMode::Clamp as u32)
            .unwrap();
        unit.set_state(StateReg::WrapV.index() as u32, WrapMode::Clamp as u32)
            .unwrap();
        unit
    }

    /// Fill the 4x4 texture so texel (x, y) holds a unique word.
    fn rgba_ram() -> Ram {
        let mut ram = Ram::new();
        for y in 0..4u64 {
            for x in 0..4u64 {
                let value = 0x0100_0000 + (y as u32) * 0x100 + (x as u32);
                ram.write_u32(0x1000 + (y * 4 + x) * 4, value, 4).unwrap();
            }
        }
        ram
    }

    /// Normalized fixed-point coordinate of the center of texel `i` on
    /// a 4-wide axis.
    fn texel_center(i: i32) -> i32 {
        (2 * i + 1) * Coord::ONE / 8
    }

    #[test]
    fn point_issues_exactly_one_read() {
        let unit = rgba_unit(FilterMode::Point);
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        let color = unit
            .read(&mut ram, texel_center(0), texel_center(0), 0, &mut addrs)
            .unwrap();
        assert_eq!(addrs, vec![0x1000]);
        assert_eq!(color, 0x0100_0000);
    }

    #[test]
    fn point_decodes_the_addressed_texel() {
        let unit = rgba_unit(FilterMode::Point);
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        let color = unit
            .read(&mut ram, texel_center(2), texel_center(3), 0, &mut addrs)
            .unwrap();
        assert_eq!(addrs, vec![0x1000 + (3 * 4 + 2) * 4]);
        assert_eq!(color, 0x0100_0302);
    }

    #[test]
    fn bilinear_issues_four_reads_in_raster_order() {
        let unit = rgba_unit(FilterMode::Bilinear);
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        // midway between the centers of texels (0,0) and (1,1)
        let coord = Coord::ONE / 4;
        unit.read(&mut ram, coord, coord, 0, &mut addrs).unwrap();
        assert_eq!(
            addrs,
            vec![0x1000, 0x1000 + 4, 0x1000 + 16, 0x1000 + 20],
            "top-left, top-right, bottom-left, bottom-right"
        );
    }

    #[test]
    fn bilinear_collapses_to_one_texel_at_integer_coordinates() {
        let unit = rgba_unit(FilterMode::Bilinear);
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        let color = unit
            .read(&mut ram, texel_center(1), texel_center(1), 0, &mut addrs)
            .unwrap();
        assert_eq!(addrs.len(), 4);
        assert_eq!(color, 0x0100_0101, "alpha = beta = 0 reduces to texel 00");
    }

    #[test]
    fn bilinear_blends_adjacent_texels() {
        let unit = rgba_unit(FilterMode::Bilinear);
        let mut ram = Ram::new();
        // row 0: red channel 0 at (0,0), 0xff at (1,0)
        ram.write_u32(0x1000, 0x0000_0000, 4).unwrap();
        ram.write_u32(0x1004, 0x0000_00ff, 4).unwrap();
        let mut addrs = Vec::new();

        // alpha = 1/2 between the two centers, beta = 0
        let color = unit
            .read(&mut ram, Coord::ONE / 4, texel_center(0), 0, &mut addrs)
            .unwrap();
        assert_eq!(color & 0xff, 0x7f);
    }

    #[test]
    fn trilinear_is_a_fatal_configuration_error() {
        let unit = rgba_unit(FilterMode::Trilinear);
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        let err = unit
            .read(&mut ram, 0, 0, 0, &mut addrs)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedFilter {
                mode: FilterMode::Trilinear
            }
            .into()
        );
        assert!(addrs.is_empty(), "no reads before the mode check");
    }

    #[test]
    fn undecodable_format_is_a_fatal_configuration_error() {
        let mut unit = rgba_unit(FilterMode::Point);
        unit.set_state(StateReg::Format.index() as u32, 99).unwrap();
        let mut ram = rgba_ram();

        let err = unit.read(&mut ram, 0, 0, 0, &mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnum {
                what: "texture format",
                value: 99
            }
            .into()
        );
    }

    #[test]
    fn state_registers_roundtrip_and_bounds_check() {
        let mut unit = TexUnit::new();
        unit.set_state(StateReg::MipOff(3).index() as u32, 0x40).unwrap();
        assert_eq!(unit.get_state(StateReg::MipOff(3).index() as u32), Ok(0x40));

        let index = NUM_STATE_REGS as u32;
        assert_eq!(
            unit.get_state(index),
            Err(ConfigError::InvalidStateRegister { index })
        );
        assert_eq!(
            unit.set_state(index, 0),
            Err(ConfigError::InvalidStateRegister { index })
        );
    }

    #[test]
    fn mip_offset_moves_the_base_address() {
        let mut unit = rgba_unit(FilterMode::Point);
        unit.set_state(StateReg::MipOff(1).index() as u32, 0x100).unwrap();
        let mut ram = rgba_ram();
        ram.write_u32(0x1100, 0xaa55_aa55, 4).unwrap();
        let mut addrs = Vec::new();

        // lod 1: 2x2 texels, (0,0) covers the whole upper-left quadrant
        let color = unit
            .read(&mut ram, texel_center(0), texel_center(0), 1, &mut addrs)
            .unwrap();
        assert_eq!(addrs, vec![0x1100]);
        assert_eq!(color, 0xaa55_aa55);
    }

    #[test]
    fn lod_saturates_the_dimension_logs() {
        let mut unit = rgba_unit(FilterMode::Point);
        // 2x2 texture sampled far past its last mip: dimensions clamp to 1x1
        unit.set_state(StateReg::Width.index() as u32, 1).unwrap();
        unit.set_state(StateReg::Height.index() as u32, 1).unwrap();
        let mut ram = rgba_ram();
        let mut addrs = Vec::new();

        unit.read(&mut ram, texel_center(3), texel_center(3), 5, &mut addrs)
            .unwrap();
        assert_eq!(addrs, vec![0x1000], "every coordinate maps to the single texel");
    }

    #[test]
    fn out_of_range_lod_is_an_invalid_register() {
        let unit = rgba_unit(FilterMode::Point);
        let mut ram = rgba_ram();

        let err = unit
            .read(&mut ram, 0, 0, super::MAX_MIP_LEVELS as u32, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            super::TexError::Config(ConfigError::InvalidStateRegister { .. })
        ));
    }

    #[test]
    fn clamp_saturates_to_the_boundary() {
        for x in [-5, -1] {
            assert_eq!(wrap_coord(x, 3, WrapMode::Clamp), 0);
        }
        for x in [8, 100] {
            assert_eq!(wrap_coord(x, 3, WrapMode::Clamp), 7);
        }
        assert_eq!(wrap_coord(5, 3, WrapMode::Clamp), 5);
    }

    #[test]
    fn wrap_is_periodic_in_the_dimension() {
        for x in -16..16 {
            assert_eq!(
                wrap_coord(x, 2, WrapMode::Wrap),
                wrap_coord(x + 4, 2, WrapMode::Wrap)
            );
        }
        assert_eq!(wrap_coord(5, 2, WrapMode::Wrap), 1);
        assert_eq!(wrap_coord(-1, 2, WrapMode::Wrap), 3);
    }

    #[test]
    fn mirror_reflects_at_each_boundary() {
        assert_eq!(wrap_coord(-1, 2, WrapMode::Mirror), 0);
        assert_eq!(wrap_coord(-2, 2, WrapMode::Mirror), 1);
        assert_eq!(wrap_coord(4, 2, WrapMode::Mirror), 3);
        assert_eq!(wrap_coord(5, 2, WrapMode::Mirror), 2);
        // symmetric around the upper boundary
        for k in 0..4 {
            assert_eq!(
                wrap_coord(3 - k, 2, WrapMode::Mirror),
                wrap_coord(4 + k, 2, WrapMode::Mirror)
            );
        }
    }

    #[test]
    fn bilinear_taps_wrap_independently_at_a_seam() {
        // footprint centered on the right edge of a 4-wide wrap axis
        let u = Coord::from_raw(4 * Coord::ONE / 4 - Coord::ONE / 8);
        let v = Coord::from_raw(Coord::ONE / 8);
        let (offsets, alpha, _beta) =
            address_bilinear(u, v, 2, 2, WrapMode::Wrap, WrapMode::Wrap);
        // left tap is texel 3, right tap wraps to texel 0
        assert_eq!(offsets[0] & 0x3, 3);
        assert_eq!(offsets[1] & 0x3, 0);
        assert_eq!(alpha, 0);
    }

    #[test]
    fn format_strides() {
        assert_eq!(TexFormat::R8G8B8A8.stride(), 4);
        assert_eq!(TexFormat::R5G6B5.stride(), 2);
        assert_eq!(TexFormat::A8L8.stride(), 2);
        assert_eq!(TexFormat::L8.stride(), 1);
        assert_eq!(TexFormat::A8.stride(), 1);
    }

    #[test]
    fn sixteen_bit_formats_expand_with_bit_replication() {
        let mut unit = rgba_unit(FilterMode::Point);
        unit.set_state(StateReg::Format.index() as u32, TexFormat::R5G6B5 as u32)
            .unwrap();
        let mut ram = Ram::new();
        // pure red: r5 = 0x1f
        ram.write_u32(0x1000, 0xf800, 2).unwrap();

        let color = unit
            .read(&mut ram, texel_center(0), texel_center(0), 0, &mut Vec::new())
            .unwrap();
        assert_eq!(color, 0xff00_00ff, "opaque alpha, fully expanded red");
    }

    #[test]
    fn luminance_broadcasts_to_rgb() {
        let mut unit = rgba_unit(FilterMode::Point);
        unit.set_state(StateReg::Format.index() as u32, TexFormat::L8 as u32)
            .unwrap();
        let mut ram = Ram::new();
        ram.write_u32(0x1000, 0x80, 1).unwrap();

        let color = unit
            .read(&mut ram, texel_center(0), texel_center(0), 0, &mut Vec::new())
            .unwrap();
        assert_eq!(color, 0xff80_8080);
    }
}
