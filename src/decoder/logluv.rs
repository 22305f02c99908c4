//! SGI LogL and LogLuv pixel encodings.
//!
//! See <http://www.anyhere.com/gward/pixformat/tiffluv.html>.

use std::f64::consts::LN_2;
use std::io::{self, BufRead, Read};

/// Unpacks one block of the SGI Log RLE compression.
///
/// Each scanline is stored as `bytes_per_pixel` separately compressed byte planes. The planes are
/// interleaved again while unpacking, so that `out` receives `width * height` consecutive pixels
/// of `bytes_per_pixel` bytes each.
///
/// A control byte with the high bit set starts a run of `byte - 126` copies of the following
/// byte, otherwise it is followed by as many literal bytes.
pub(crate) fn unpack_sgi_rle<R: BufRead>(
    mut reader: R,
    bytes_per_pixel: usize,
    width: usize,
    height: usize,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    let row_len = width * bytes_per_pixel;
    out.clear();
    out.resize(row_len * height, 0);
    if row_len == 0 {
        return Ok(());
    }

    for row in out.chunks_exact_mut(row_len) {
        for channel in 0..bytes_per_pixel {
            let mut lane = row[channel..].iter_mut().step_by(bytes_per_pixel);
            let mut remaining = width;

            while remaining > 0 {
                let control = read_byte(&mut reader)?;

                if control & 0x80 != 0 {
                    let run = usize::from(control) - 126;
                    let value = read_byte(&mut reader)?;
                    for pixel in lane.by_ref().take(run) {
                        *pixel = value;
                    }
                    remaining = remaining.saturating_sub(run);
                } else {
                    let run = usize::from(control);
                    for _ in 0..run {
                        let value = read_byte(&mut reader)?;
                        // A run reaching past the scanline is consumed but dropped.
                        if let Some(pixel) = lane.next() {
                            *pixel = value;
                        }
                    }
                    remaining = remaining.saturating_sub(run);
                }
            }
        }
    }

    Ok(())
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Luminance of a 16-bit signed log code, the sign in the high bit.
pub(crate) fn log16_to_y(code: u16) -> f64 {
    let le = code & 0x7fff;
    if le == 0 {
        return 0.0;
    }

    let y = (LN_2 / 256.0 * (f64::from(le) + 0.5) - LN_2 * 64.0).exp();
    if code & 0x8000 != 0 {
        -y
    } else {
        y
    }
}

/// The luminance of a LogL pixel, stored as a big endian 16-bit code.
pub(crate) fn logl_to_y(pixel: [u8; 2]) -> f64 {
    log16_to_y(u16::from_be_bytes(pixel))
}

/// XYZ of a 32-bit LogLuv pixel.
///
/// The first two bytes hold the log luminance as in LogL, followed by the 8-bit encoded u' and v'
/// chromaticity coordinates.
pub(crate) fn logluv_to_xyz(pixel: [u8; 4]) -> [f64; 3] {
    let y = logl_to_y([pixel[0], pixel[1]]);
    if y <= 0.0 {
        return [0.0; 3];
    }

    let u = (f64::from(pixel[2]) + 0.5) / 410.0;
    let v = (f64::from(pixel[3]) + 0.5) / 410.0;

    let s = 1.0 / (6.0 * u - 16.0 * v + 12.0);
    let cx = 9.0 * u * s;
    let cy = 4.0 * v * s;

    [cx / cy * y, y, (1.0 - cx - cy) / cy * y]
}
