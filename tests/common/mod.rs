//! Building small TIFF files in memory.

#![allow(dead_code)]

use std::io::Cursor;

pub const IMAGE_WIDTH: u16 = 256;
pub const IMAGE_LENGTH: u16 = 257;
pub const BITS_PER_SAMPLE: u16 = 258;
pub const COMPRESSION: u16 = 259;
pub const PHOTOMETRIC: u16 = 262;
pub const STRIP_OFFSETS: u16 = 273;
pub const SAMPLES_PER_PIXEL: u16 = 277;
pub const ROWS_PER_STRIP: u16 = 278;
pub const STRIP_BYTE_COUNTS: u16 = 279;
pub const PREDICTOR: u16 = 317;
pub const TILE_WIDTH: u16 = 322;
pub const TILE_LENGTH: u16 = 323;
pub const TILE_OFFSETS: u16 = 324;
pub const TILE_BYTE_COUNTS: u16 = 325;
pub const NEW_SUBFILE_TYPE: u16 = 254;
pub const SUB_IFDS: u16 = 330;
pub const SAMPLE_FORMAT: u16 = 339;
pub const CFA_REPEAT_PATTERN_DIM: u16 = 33421;
pub const CFA_PATTERN: u16 = 33422;
pub const STONITS: u16 = 37439;
pub const DNG_VERSION: u16 = 50706;
pub const BLACK_LEVEL: u16 = 50714;
pub const WHITE_LEVEL: u16 = 50717;
pub const COLOR_MATRIX_1: u16 = 50721;
pub const AS_SHOT_NEUTRAL: u16 = 50728;
pub const BASELINE_EXPOSURE: u16 = 50730;
pub const ARTIST: u16 = 315;

pub const RGB: u16 = 2;
pub const CFA: u16 = 32803;
pub const LOGL: u16 = 32844;
pub const LOGLUV: u16 = 32845;

pub const NO_COMPRESSION: u16 = 1;
pub const LZW: u16 = 5;
pub const DEFLATE: u16 = 8;
pub const PACKBITS: u16 = 32773;
pub const SGILOG_RLE: u16 = 34676;

/// A typed tag value.
#[derive(Clone, Debug)]
pub enum Value {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SShort(Vec<i16>),
    SRational(Vec<(i32, i32)>),
    Double(Vec<f64>),
    Ifd(Vec<u32>),
}

impl Value {
    fn type_id(&self) -> u16 {
        match self {
            Value::Byte(_) => 1,
            Value::Ascii(_) => 2,
            Value::Short(_) => 3,
            Value::Long(_) => 4,
            Value::Rational(_) => 5,
            Value::SShort(_) => 8,
            Value::SRational(_) => 10,
            Value::Double(_) => 12,
            Value::Ifd(_) => 13,
        }
    }

    fn count(&self) -> u32 {
        let n = match self {
            Value::Byte(v) => v.len(),
            Value::Ascii(s) => s.len() + 1,
            Value::Short(v) => v.len(),
            Value::Long(v) => v.len(),
            Value::Rational(v) => v.len(),
            Value::SShort(v) => v.len(),
            Value::SRational(v) => v.len(),
            Value::Double(v) => v.len(),
            Value::Ifd(v) => v.len(),
        };
        n as u32
    }
}

/// An entry of a directory under construction.
#[derive(Clone, Debug)]
pub struct Field {
    pub tag: u16,
    pub value: Value,
}

pub fn field(tag: u16, value: Value) -> Field {
    Field { tag, value }
}

pub fn short(tag: u16, value: u16) -> Field {
    field(tag, Value::Short(vec![value]))
}

pub fn long(tag: u16, value: u32) -> Field {
    field(tag, Value::Long(vec![value]))
}

/// Writes a TIFF file piece by piece. Pixel data and directories are appended in call order, the
/// header is patched to point at the main directory on `finish`.
pub struct TiffWriter {
    big_endian: bool,
    buf: Vec<u8>,
}

impl TiffWriter {
    pub fn new(big_endian: bool) -> Self {
        let mut buf = Vec::new();
        if big_endian {
            buf.extend_from_slice(b"MM\x00\x2A");
        } else {
            buf.extend_from_slice(b"II\x2A\x00");
        }
        buf.extend_from_slice(&[0; 4]);
        TiffWriter { big_endian, buf }
    }

    fn u16(&self, v: u16) -> [u8; 2] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u32(&self, v: u32) -> [u8; 4] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u64(&self, v: u64) -> [u8; 8] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn encode(&self, value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        match value {
            Value::Byte(v) => out.extend_from_slice(v),
            Value::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            Value::Short(v) => v.iter().for_each(|&x| out.extend_from_slice(&self.u16(x))),
            Value::SShort(v) => v
                .iter()
                .for_each(|&x| out.extend_from_slice(&self.u16(x as u16))),
            Value::Long(v) | Value::Ifd(v) => {
                v.iter().for_each(|&x| out.extend_from_slice(&self.u32(x)))
            }
            Value::Rational(v) => v.iter().for_each(|&(n, d)| {
                out.extend_from_slice(&self.u32(n));
                out.extend_from_slice(&self.u32(d));
            }),
            Value::SRational(v) => v.iter().for_each(|&(n, d)| {
                out.extend_from_slice(&self.u32(n as u32));
                out.extend_from_slice(&self.u32(d as u32));
            }),
            Value::Double(v) => v
                .iter()
                .for_each(|&x| out.extend_from_slice(&self.u64(x.to_bits()))),
        }
        out
    }

    fn align(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    /// Appends raw bytes and returns their offset.
    pub fn data(&mut self, bytes: &[u8]) -> u32 {
        self.align();
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(bytes);
        offset
    }

    /// Appends a directory with its out-of-line values and returns its offset.
    pub fn ifd(&mut self, fields: &[Field]) -> u32 {
        let mut fields = fields.to_vec();
        fields.sort_by_key(|f| f.tag);

        let mut slots = Vec::with_capacity(fields.len());
        for f in &fields {
            let bytes = self.encode(&f.value);
            let slot = if bytes.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..bytes.len()].copy_from_slice(&bytes);
                inline
            } else {
                let offset = self.data(&bytes);
                self.u32(offset)
            };
            slots.push(slot);
        }

        self.align();
        let offset = self.buf.len() as u32;
        let count = self.u16(fields.len() as u16);
        self.buf.extend_from_slice(&count);
        for (f, slot) in fields.iter().zip(slots) {
            let tag = self.u16(f.tag);
            let type_ = self.u16(f.value.type_id());
            let n = self.u32(f.value.count());
            self.buf.extend_from_slice(&tag);
            self.buf.extend_from_slice(&type_);
            self.buf.extend_from_slice(&n);
            self.buf.extend_from_slice(&slot);
        }
        self.buf.extend_from_slice(&[0; 4]);
        offset
    }

    pub fn finish(mut self, main_ifd: u32) -> Vec<u8> {
        let offset = self.u32(main_ifd);
        self.buf[4..8].copy_from_slice(&offset);
        self.buf
    }
}

/// A single strip image with the given pixel bytes and additional fields.
pub fn strip_image(
    big_endian: bool,
    width: u32,
    height: u32,
    photometric: u16,
    bits_per_sample: u16,
    compression: u16,
    strip: &[u8],
    extra: &[Field],
) -> Vec<u8> {
    let mut w = TiffWriter::new(big_endian);
    let offset = w.data(strip);

    let mut fields = vec![
        long(IMAGE_WIDTH, width),
        long(IMAGE_LENGTH, height),
        short(BITS_PER_SAMPLE, bits_per_sample),
        short(COMPRESSION, compression),
        short(PHOTOMETRIC, photometric),
        long(STRIP_OFFSETS, offset),
        long(ROWS_PER_STRIP, height),
        long(STRIP_BYTE_COUNTS, strip.len() as u32),
    ];
    fields.extend_from_slice(extra);

    let ifd = w.ifd(&fields);
    w.finish(ifd)
}

pub fn cursor(file: Vec<u8>) -> Cursor<Vec<u8>> {
    Cursor::new(file)
}

/// 32-bit float RGB pixels in the requested byte order.
pub fn rgb_bytes(big_endian: bool, pixels: &[[f32; 3]]) -> Vec<u8> {
    pixels
        .iter()
        .flatten()
        .flat_map(|v| {
            if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        })
        .collect()
}

/// Encodes one plane of a scanline with the SGI Log run length scheme.
fn encode_sgi_plane(plane: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < plane.len() {
        let mut run = 1;
        while i + run < plane.len() && plane[i + run] == plane[i] && run < 129 {
            run += 1;
        }

        if run >= 2 {
            out.push((run + 126) as u8);
            out.push(plane[i]);
            i += run;
        } else {
            let start = i;
            while i < plane.len()
                && i - start < 127
                && !(i + 1 < plane.len() && plane[i + 1] == plane[i])
            {
                i += 1;
            }
            if i == start {
                i += 1;
            }
            out.push((i - start) as u8);
            out.extend_from_slice(&plane[start..i]);
        }
    }
}

/// SGI Log RLE of a block of `width` pixels of `bytes_per_pixel` bytes per row.
pub fn encode_sgi_rle(pixels: &[u8], bytes_per_pixel: usize, width: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for row in pixels.chunks(width * bytes_per_pixel) {
        for channel in 0..bytes_per_pixel {
            let plane: Vec<u8> = row[channel..].iter().step_by(bytes_per_pixel).copied().collect();
            encode_sgi_plane(&plane, &mut out);
        }
    }
    out
}

/// PackBits, literal runs only.
pub fn encode_packbits_literal(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(128) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
    out
}

pub fn encode_lzw(data: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .encode(data)
        .expect("lzw encoding of test data")
}

pub fn encode_deflate(data: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("deflate encoding of test data");
    encoder.finish().expect("deflate encoding of test data")
}
