//! GIF encoding: canvas size, frame count, delay, and loop extension.

use clipgif::{GifTiming, PipelineError, encode_gif};
use gif::{ColorOutput, DecodeOptions, Repeat};
use image::{Rgb, RgbImage};

struct Decoded {
    width: u16,
    height: u16,
    delays: Vec<u16>,
    repeat: Repeat,
}

fn decode(bytes: &[u8]) -> Decoded {
    let mut options = DecodeOptions::new();
    options.set_color_output(ColorOutput::Indexed);
    let mut decoder = options.read_info(bytes).expect("valid GIF header");

    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid GIF frame") {
        delays.push(frame.delay);
    }

    Decoded {
        width: decoder.width(),
        height: decoder.height(),
        delays,
        repeat: decoder.repeat(),
    }
}

fn has_loop_extension(bytes: &[u8]) -> bool {
    bytes.windows(11).any(|window| window == b"NETSCAPE2.0")
}

fn frames(count: usize, width: u32, height: u32) -> Vec<RgbImage> {
    (0..count)
        .map(|index| {
            let shade = (index * 40 % 256) as u8;
            RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128]))
        })
        .collect()
}

fn timing(delay_centiseconds: u16, repeat: Option<Repeat>) -> GifTiming {
    GifTiming {
        delay_centiseconds,
        repeat,
    }
}

#[test]
fn encodes_every_frame_with_the_same_delay() {
    let bytes = encode_gif(&frames(5, 32, 24), timing(12, Some(Repeat::Infinite))).unwrap();
    assert!(bytes.starts_with(b"GIF89a"));

    let decoded = decode(&bytes);
    assert_eq!((decoded.width, decoded.height), (32, 24));
    assert_eq!(decoded.delays, vec![12; 5]);
}

#[test]
fn loop_forever_writes_infinite_repeat() {
    let bytes = encode_gif(&frames(2, 8, 8), timing(10, Some(Repeat::Infinite))).unwrap();
    assert!(has_loop_extension(&bytes));
    assert_eq!(decode(&bytes).repeat, Repeat::Infinite);
}

#[test]
fn loop_once_writes_a_count_of_one() {
    let bytes = encode_gif(&frames(2, 8, 8), timing(10, Some(Repeat::Finite(1)))).unwrap();
    assert!(has_loop_extension(&bytes));
    assert_eq!(decode(&bytes).repeat, Repeat::Finite(1));
}

#[test]
fn no_loop_omits_the_extension() {
    let bytes = encode_gif(&frames(2, 8, 8), timing(10, None)).unwrap();
    assert!(!has_loop_extension(&bytes));
    assert_eq!(decode(&bytes).delays.len(), 2);
}

#[test]
fn single_frame_is_a_valid_gif() {
    let bytes = encode_gif(&frames(1, 3, 5), timing(33, None)).unwrap();
    let decoded = decode(&bytes);
    assert_eq!((decoded.width, decoded.height), (3, 5));
    assert_eq!(decoded.delays, vec![33]);
}

#[test]
fn no_frames_is_an_error() {
    let error = encode_gif(&[], timing(10, None)).expect_err("nothing to encode");
    assert!(matches!(error, PipelineError::EncodeFailed(_)));
}

#[test]
fn mismatched_frame_sizes_are_an_error() {
    let mut sequence = frames(2, 8, 8);
    sequence.push(RgbImage::new(4, 4));
    let error = encode_gif(&sequence, timing(10, None)).expect_err("size mismatch");
    assert!(matches!(error, PipelineError::EncodeFailed(_)));
    assert!(error.to_string().contains("differs from canvas"));
}

#[test]
fn oversized_frames_are_an_error() {
    let huge = vec![RgbImage::new(70_000, 1)];
    let error = encode_gif(&huge, timing(10, None)).expect_err("too wide for GIF");
    assert!(error.to_string().contains("65535"));
}
