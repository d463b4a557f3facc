//! Integration tests for the kara timing engine
//!
//! Tests full pipelines through the public API: tag decode and encode, live
//! marking against a transport, line lookup, and audio feature extraction.

use kara::audio::{AudioInput, FeatureCache, FeatureEntry, FeatureKind, FeatureWorker};
use kara::derive::{auto_split, char_progress};
use kara::timing::{drag_block, drag_edge, DragHandle, Effect, TimingEditor, TransportTick};
use kara::validate::validate_lines;
use kara::{
    decode, decode_line, encode, encode_line, load_line, EngineConfig, KaraError, Line, LineLocator,
    Syllable, TagKind,
};
use std::time::Duration;

fn approx(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

#[test]
fn test_decode_pauses_and_syllables() {
    let line = load_line(r"{\kf130}{\kf10}阳{\kf29}{\kf12}光", 0.0, 2.0).unwrap();
    assert_eq!(line.text, "阳光");
    let s = line.syllables();
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].text, "阳");
    assert!(approx(s[0].start_offset, 1.30, 1e-9));
    assert!(approx(s[0].duration, 0.10, 1e-9));
    assert_eq!(s[1].text, "光");
    assert!(approx(s[1].start_offset, 1.69, 1e-9));
    assert!(approx(s[1].duration, 0.12, 1e-9));
    assert_eq!((s[1].char_start, s[1].char_end), (1, 2));
}

#[test]
fn test_malformed_tags() {
    let err = load_line(r"ab{\k20", 0.0, 1.0).unwrap_err();
    assert!(matches!(err, KaraError::ParseError { position: 2, .. }));

    // The lenient path keeps the text and drops the broken group.
    let line = decode_line(r"ab{\k20", 0.0, 1.0);
    assert_eq!(line.text, "ab");
    assert!(!line.has_syllables());
}

#[test]
fn test_encode_decode_round_trip() {
    let syllables = vec![
        Syllable::new("Twin", 0.25, 0.4, 0, 4),
        Syllable::new("kle ", 0.65, 0.333, 4, 8),
        Syllable::new("star", 1.5, 0.777, 8, 12),
    ];
    let encoded = encode(&syllables);
    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded.text, "Twinkle star");

    let back = decoded.syllables.unwrap();
    assert_eq!(back.len(), syllables.len());
    for (a, b) in syllables.iter().zip(&back) {
        assert_eq!(a.text, b.text);
        assert!(approx(a.start_offset, b.start_offset, 0.01), "{:?} vs {:?}", a, b);
        assert!(approx(a.duration, b.duration, 0.01), "{:?} vs {:?}", a, b);
    }
}

#[test]
fn test_untimed_line_encodes_as_even_split() {
    let line = Line::new("abcd", 0.0, 2.0);
    let encoded = encode_line(&line, TagKind::Kf);
    assert_eq!(encoded, r"{\kf50}a{\kf50}b{\kf50}c{\kf50}d");

    let decoded = decode(&encoded).unwrap().syllables.unwrap();
    let split = auto_split(&line);
    assert_eq!(decoded.len(), split.len());
    for (a, b) in decoded.iter().zip(&split) {
        assert!(approx(a.start_offset, b.start_offset, 0.01));
        assert!(approx(a.duration, b.duration, 0.01));
    }

    // Splitting an already split line changes nothing.
    let again = auto_split(&line.clone().with_syllables(split.clone()));
    assert_eq!(again, split);
}

#[test]
fn test_mark_two_syllables_then_encode() {
    let mut lines = vec![Line::new("Hi", 0.0, 2.0)];
    let mut editor = TimingEditor::default();
    for t in [0.5, 1.2, 2.0] {
        editor.mark(&mut lines, t);
    }

    let s = lines[0].syllables();
    assert_eq!(s.len(), 2);
    assert!(approx(s[0].start_offset, 0.5, 1e-9) && approx(s[0].duration, 0.7, 1e-9));
    assert!(approx(s[1].start_offset, 1.2, 1e-9) && approx(s[1].duration, 0.8, 1e-9));
    assert_eq!(editor.session().marking_index, 2);
    assert!(!editor.session().is_recording());
    assert_eq!(encode_line(&lines[0], TagKind::K), r"{\k50}{\k70}H{\k80}i");
}

#[test]
fn test_active_span_locator() {
    let lines = vec![Line::new("a", 0.0, 5.0), Line::new("b", 5.0, 10.0)];
    let locator = LineLocator::new(&lines);
    assert_eq!(locator.active_line_index(7.0), Some(1));
    assert_eq!(locator.active_line_index(5.0), Some(1));
    assert_eq!(locator.active_line_index(-1.0), None);
    assert_eq!(locator.active_line_index(10.0), None);
}

#[test]
fn test_edit_session_keeps_every_line_valid() {
    let mut lines = vec![
        Line::new("karaoke", 10.0, 14.0),
        Line::new("night", 14.0, 16.0),
    ];
    let mut editor = TimingEditor::default();
    assert_eq!(editor.select_line(&lines, 0), Effect::Seek { time: 10.0 });

    for t in [10.2, 10.5, 10.9, 11.0, 11.8] {
        editor.mark(&mut lines, t);
        assert!(validate_lines(&lines).is_empty(), "after mark at {}", t);
    }
    editor.undo_mark(&mut lines);
    // Late and out-of-range taps are clamped, never rejected.
    for t in [11.5, 12.2, 13.9, 15.0, 15.5] {
        editor.mark(&mut lines, t);
        assert!(validate_lines(&lines).is_empty(), "after mark at {}", t);
    }
    assert_eq!(lines[0].syllables().len(), 7);

    for (index, target) in [(0, 9.0), (3, 13.9), (6, 20.0), (2, 10.0)] {
        drag_edge(&mut lines[0], index, DragHandle::Start, target);
        drag_edge(&mut lines[0], index, DragHandle::End, target);
        drag_block(&mut lines[0], index, target);
        assert!(validate_lines(&lines).is_empty(), "after drags to {}", target);
    }

    let tick = |time| TransportTick {
        time,
        playing: true,
    };
    assert_eq!(editor.tick(&lines, tick(14.0)), Effect::AdvanceLine { from: 0, to: 1 });
    editor.auto_split(&mut lines);
    assert!(validate_lines(&lines).is_empty());
    assert_eq!(editor.tick(&lines, tick(16.0)), Effect::Pause);
}

#[test]
fn test_loop_mode_from_config() {
    let config = EngineConfig::from_yaml("loop-mode: true\nscrub-tolerance: 0.5\n").unwrap();
    let lines = vec![Line::new("la", 3.0, 6.0), Line::new("li", 6.0, 9.0)];
    let mut editor = TimingEditor::new(&config);
    editor.select_line(&lines, 0);

    let effect = editor.tick(
        &lines,
        TransportTick {
            time: 6.0,
            playing: true,
        },
    );
    assert_eq!(effect, Effect::SeekAndPlay { time: 3.0 });
    assert_eq!(editor.line_index(), 0);
}

#[test]
fn test_character_progress_follows_syllables() {
    let line = load_line(r"{\k50}ab{\k50}c", 1.0, 2.0).unwrap();
    let at = |t| char_progress(&line, Some(line.syllables()), t).unwrap();
    assert_eq!(at(1.0).index, 0);
    assert!(approx(at(1.125).progress, 0.5, 1e-9));
    assert_eq!(at(1.3).index, 1);
    assert_eq!(at(1.75).index, 2);
}

fn write_sine_wav(path: &std::path::Path, freq: f32, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f32 * seconds) as usize;
    for i in 0..n {
        let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin();
        writer.write_sample((x * 16000.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_spectrogram_of_sine_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sine.wav");
    write_sine_wav(&path, 1000.0, 44100, 1.0);

    let mut cache = FeatureCache::new(FeatureWorker::spawn().unwrap());
    let kind = FeatureKind::Spectrogram {
        fft_size: 512,
        hop_size: 128,
    };
    cache.request("sine", kind, || AudioInput::File(path.clone()));
    let entry = cache.wait(kind, Duration::from_secs(60));
    assert!(matches!(entry, Some(FeatureEntry::Ready(_))), "{:?}", entry);

    let spec = cache.spectrogram(512, 128).unwrap();
    assert_eq!(spec.num_frames, (44100 - 512) / 128 + 1);
    assert_eq!(spec.num_bins, 256);
    let expected_bin = (1000.0f64 * 512.0 / 44100.0).round() as usize;
    for f in 0..spec.num_frames {
        let frame = spec.frame(f).unwrap();
        let peak = (0..frame.len())
            .fold(0, |best, i| if frame[i] > frame[best] { i } else { best });
        assert_eq!(peak, expected_bin, "frame {}", f);
    }
}

#[test]
fn test_line_features_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 440.0, 8000, 3.0);

    let config = EngineConfig::default();
    let mut cache = FeatureCache::new(FeatureWorker::spawn().unwrap());
    let kind = FeatureKind::waveform_for(&config);
    cache.request("tone", kind, || AudioInput::File(path.clone()));
    cache.wait(kind, Duration::from_secs(60));

    let line = Line::new("la", 1.0, 2.0);
    let features = cache.line_features(&line, &config);
    let peaks = features.waveform.unwrap();
    assert_eq!(peaks.len(), config.waveform_buckets_per_second as usize);
    assert!(peaks.iter().all(|&p| p > 0.9));
    assert!(features.spectrogram.is_none());
}
