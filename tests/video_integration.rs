//! Integration tests for the FFmpeg-backed reader and clip export
//!
//! Test clips are encoded on the fly with MPEG-4 so no media fixtures are
//! needed. If the FFmpeg build has no MPEG-4 encoder the media tests skip.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::{codec, encoder, format, Packet, Rational};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use vidcrop::video::export::{ExportEvent, ExportJob, ExportRequest};
use vidcrop::{CropRegion, CropSession, Error, FrameSource, Point, VideoReader};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FRAMES: usize = 20;
const FPS: i32 = 10;

/// Encode `frames` frames whose luma pattern shifts with the frame index.
/// Returns `false` when no MPEG-4 encoder is available.
fn write_test_video(path: &Path, frames: usize) -> bool {
    vidcrop::video::init_ffmpeg().expect("init ffmpeg");
    let Some(codec) = encoder::find(codec::Id::MPEG4) else {
        return false;
    };

    let mut output = format::output(&path).expect("create output");
    let global_header = output
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);
    let mut stream = output.add_stream(codec).expect("add stream");
    let stream_index = stream.index();
    let time_base = Rational::new(1, FPS);

    let mut context = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .expect("video encoder");
    context.set_width(WIDTH);
    context.set_height(HEIGHT);
    context.set_format(Pixel::YUV420P);
    context.set_time_base(time_base);
    context.set_frame_rate(Some(Rational::new(FPS, 1)));
    context.set_gop(5);
    context.set_max_b_frames(0);
    if global_header {
        context.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = context.open_as(codec).expect("open encoder");
    stream.set_parameters(&encoder);
    stream.set_time_base(time_base);

    output.write_header().expect("write header");
    let stream_time_base = output.stream(stream_index).expect("stream").time_base();

    let drain = |encoder: &mut encoder::video::Encoder, output: &mut format::context::Output| {
        let mut packet = Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(stream_index);
            packet.rescale_ts(time_base, stream_time_base);
            packet.write_interleaved(output).expect("write packet");
        }
    };

    for index in 0..frames {
        let mut frame = VideoFrame::new(Pixel::YUV420P, WIDTH, HEIGHT);
        let stride = frame.stride(0);
        for (y, row) in frame.data_mut(0).chunks_mut(stride).take(HEIGHT as usize).enumerate() {
            for (x, value) in row[..WIDTH as usize].iter_mut().enumerate() {
                *value = (16 + (x * 2 + y + index * 11) % 200) as u8;
            }
        }
        for plane in 1..3 {
            frame.data_mut(plane).fill(128);
        }
        frame.set_pts(Some(index as i64));
        encoder.send_frame(&frame).expect("send frame");
        drain(&mut encoder, &mut output);
    }

    encoder.send_eof().expect("send eof");
    drain(&mut encoder, &mut output);
    output.write_trailer().expect("write trailer");
    true
}

/// A fresh test clip in its own temp dir, or `None` to skip
fn test_video() -> Option<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pattern.mp4");
    write_test_video(&path, FRAMES).then_some((dir, path))
}

fn wait_for_final(job: &mut ExportJob) -> ExportEvent {
    let deadline = Instant::now() + Duration::from_secs(60);
    while Instant::now() < deadline {
        if let Some(event) = job.poll().into_iter().find(ExportEvent::is_final) {
            return event;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("export did not finish in time");
}

#[test]
fn test_open_missing_file_fails() {
    let result = VideoReader::open(Path::new("tests/data/does-not-exist.mp4"));
    assert!(result.is_err(), "Opening a missing file should fail");
}

#[test]
fn test_open_non_video_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("notes.mp4");
    std::fs::write(&path, b"definitely not a video").expect("write file");
    assert!(VideoReader::open(&path).is_err());
}

#[test]
fn test_open_probes_dimensions_and_length() {
    let Some((_dir, path)) = test_video() else {
        return;
    };
    let reader = VideoReader::open(&path).expect("open clip");
    assert_eq!((reader.width(), reader.height()), (WIDTH, HEIGHT));
    assert_eq!(reader.num_frames(), FRAMES);
    assert!((reader.fps() - f64::from(FPS)).abs() < 0.01);
    assert_eq!(reader.crop(), CropRegion::full(WIDTH, HEIGHT));
}

#[test]
fn test_read_past_end_is_out_of_range() {
    let Some((_dir, path)) = test_video() else {
        return;
    };
    let mut reader = VideoReader::open(&path).expect("open clip");
    let end = reader.num_frames();
    let err = reader.read_frame(end).unwrap_err();
    assert!(matches!(err, Error::FrameOutOfRange { index, num_frames } if index == end && num_frames == end));
}

#[test]
fn test_seek_read_matches_sequential_read() {
    let Some((_dir, path)) = test_video() else {
        return;
    };

    let mut sequential = VideoReader::open(&path).expect("open clip");
    let frames: Vec<_> = (0..FRAMES)
        .map(|i| sequential.read_frame(i).expect("sequential read"))
        .collect();
    assert_ne!(frames[7].data, frames[8].data, "Test frames should differ");

    // Backwards jumps force a seek to the preceding keyframe
    let mut seeking = VideoReader::open(&path).expect("open clip");
    for index in [FRAMES - 1, 7, 3, 12, 0] {
        let frame = seeking.read_frame(index).expect("seek read");
        assert_eq!(frame.shape(), (HEIGHT as usize, WIDTH as usize, 3));
        assert_eq!(frame.data, frames[index].data, "Frame {index} differs after seek");
    }
}

#[test]
fn test_crop_session_shapes_on_video() {
    let Some((_dir, path)) = test_video() else {
        return;
    };
    let mut reader = VideoReader::open(&path).expect("open clip");
    let full = reader.read_frame(4).expect("read frame");

    let region = CropRegion::new(10, 30, 5, 25).unwrap();
    let cropped = CropSession::new(&mut reader).apply(region, 4).expect("apply");
    assert_eq!(cropped.shape(), (20, 20, 3));
    assert_eq!(cropped.pixel(0, 0), full.pixel(10, 5));

    let inner = CropSession::new(&mut reader)
        .commit(Point::new(2.0, 3.0), Point::new(6.0, 8.0), 4)
        .expect("commit");
    assert_eq!(inner.shape(), (5, 4, 3));
    assert_eq!(inner.pixel(0, 0), full.pixel(12, 8));

    let reset = CropSession::new(&mut reader).reset(4).expect("reset");
    assert_eq!(reset.shape(), (HEIGHT as usize, WIDTH as usize, 3));
}

#[test]
fn test_export_clip_round_trip() {
    let Some((dir, path)) = test_video() else {
        return;
    };
    let output = dir.path().join("cropped.mp4");
    let request = ExportRequest {
        source: path,
        crop: CropRegion::new(0, 33, 0, 21).unwrap(),
        frames: (0..10).collect(),
        output: output.clone(),
    };

    let mut job = ExportJob::spawn(request).expect("start export");
    assert_eq!(wait_for_final(&mut job), ExportEvent::Finished(output.clone()));

    let reader = VideoReader::open(&output).expect("open export");
    assert_eq!((reader.width(), reader.height()), (32, 20));
    assert_eq!(reader.num_frames(), 10);
}

#[test]
fn test_export_missing_source_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("out.mp4");
    let request = ExportRequest {
        source: dir.path().join("missing.mp4"),
        crop: CropRegion::full(8, 8),
        frames: vec![0],
        output: output.clone(),
    };

    let mut job = ExportJob::spawn(request).expect("start export");
    assert!(matches!(wait_for_final(&mut job), ExportEvent::Failed(_)));
    assert!(!output.exists(), "Failed export should leave no file behind");
}
