//! End-to-end pipeline: decode a directory of images, draw label markers,
//! write the result out, and read it back.

use std::path::Path;

use framecap::sequence::{Direction, FrameSequence, PassOptions, StreamedSequence};
use framecap::sink::ImageSequenceSink;
use framecap::source::{self, ImageDirSource};
use framecap::{transforms, LabelStore, Position, Shape};
use image::{ImageBuffer, Rgb};
use std::rc::Rc;

fn write_png(dir: &Path, name: &str, value: u8) {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(8, 8, Rgb([value, value, value]));
    img.save(dir.join(name)).unwrap();
}

#[test]
fn annotate_and_round_trip_through_image_files() {
    let input = tempfile::tempdir().unwrap();
    for frame in 0u8..4 {
        write_png(input.path(), &format!("f{frame}.png"), frame * 10);
    }

    let store: LabelStore = [(1, Position::new(4.0, 3.0)), (3, Position::new(1.0, 1.0))]
        .into_iter()
        .collect();

    let src = source::from_path(input.path().to_str().unwrap()).unwrap();
    let mut sequence = StreamedSequence::load(src).unwrap();
    assert_eq!(sequence.length(), 4);
    assert_eq!(sequence.shape(), Shape::new(8, 8, 3));

    sequence
        .apply(
            PassOptions::new(),
            transforms::annotate(store, 1, vec![255, 0, 0]),
        )
        .unwrap();

    let output = tempfile::tempdir().unwrap();
    let mut sink = ImageSequenceSink::new(output.path()).unwrap();
    sequence.write_to(&mut sink).unwrap();

    let reloaded =
        StreamedSequence::load(Rc::new(ImageDirSource::new(output.path()).unwrap())).unwrap();
    assert_eq!(reloaded.length(), 4);

    let frames: Vec<_> = reloaded
        .frames(Direction::Forward)
        .map(|item| item.unwrap())
        .collect();
    // marker at (x=4, y=3) on frame 1: red square over rows 2..4, cols 3..5
    let marked = &frames[1].1;
    assert_eq!(marked.get(3, 4, 0), 255);
    assert_eq!(marked.get(3, 4, 1), 0);
    assert_eq!(marked.get(2, 3, 0), 255);
    // untouched pixel keeps its gray value
    assert_eq!(marked.get(7, 7, 0), 10);
    // frame 0 has no stored position
    assert_eq!(frames[0].1.get(3, 4, 0), 0);
}

#[test]
fn masking_then_annotating_composes_lazily() {
    let input = tempfile::tempdir().unwrap();
    for frame in 0u8..3 {
        write_png(input.path(), &format!("f{frame}.png"), 100);
    }
    let src = source::from_path(input.path().to_str().unwrap()).unwrap();
    let mut sequence = StreamedSequence::load(src).unwrap();

    sequence
        .apply(
            PassOptions::new(),
            transforms::mask_outside_ellipse((3.5, 3.5), (3.0, 3.0), false),
        )
        .unwrap();
    let store: LabelStore = [(0, Position::new(3.0, 3.0))].into_iter().collect();
    sequence
        .apply(
            PassOptions::new(),
            transforms::annotate(store, 1, vec![0, 255, 0]),
        )
        .unwrap();

    // traverse twice; the pipeline recomputes identically each time
    for _ in 0..2 {
        let frames: Vec<_> = sequence
            .frames(Direction::Forward)
            .map(|item| item.unwrap())
            .collect();
        assert_eq!(frames.len(), 3);
        let first = &frames[0].1;
        assert_eq!(first.get(0, 0, 0), 0);
        assert_eq!(first.get(3, 3, 1), 255);
        let second = &frames[1].1;
        assert_eq!(second.get(3, 3, 1), 100);
    }
}
