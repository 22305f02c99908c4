#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut limits = hdr_tiff::decoder::Limits::default();
    limits.decoding_buffer_size = 1_000_000;
    limits.ifd_value_size = 1_000_000;
    limits.intermediate_buffer_size = 1_000_000;

    let mut decoder = if let Ok(d) =
        hdr_tiff::decoder::Decoder::new_with_limits(std::io::Cursor::new(data), limits)
    {
        d
    } else {
        return;
    };

    let _ = decoder.describe();
    let _ = decoder.read_image();
});
