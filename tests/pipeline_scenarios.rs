use pinchctl::config::{Profile, Screen};
use pinchctl::events::JsonLinesSink;
use pinchctl::hover::{HoverEvent, HoverTracker, RectRegions};
use pinchctl::ingest;
use pinchctl::landmarks::{INDEX_TIP, LANDMARK_COUNT, MIDDLE_TIP, THUMB_TIP};
use pinchctl::{LandmarkFrame, Pipeline, Point, PointerEvent, SwipeDirection};

const FRAME_MS: f64 = 33.0;

/// Hand with the index tip at (`ix`, `iy`), thumb `d_index` to its right and
/// the middle tip `d_middle` below the thumb.
fn hand(t_ms: f64, ix: f32, iy: f32, d_index: f32, d_middle: f32) -> LandmarkFrame {
    let mut pts = vec![Point::new(0.5, 0.8); LANDMARK_COUNT];
    pts[INDEX_TIP] = Point::new(ix, iy);
    pts[THUMB_TIP] = Point::new(ix + d_index, iy);
    pts[MIDDLE_TIP] = Point::new(ix + d_index, iy + d_middle);
    LandmarkFrame::new(t_ms, &pts).unwrap()
}

fn profile_1000() -> Profile {
    let mut p = Profile::default();
    p.screen = Screen {
        width: 1000,
        height: 1000,
    };
    p
}

fn non_moves(events: &[PointerEvent]) -> Vec<PointerEvent> {
    events.iter().filter(|e| !e.is_move()).copied().collect()
}

#[test]
fn pinch_then_release_clicks_once() {
    let mut p = Pipeline::new(&profile_1000());
    let mut per_frame = Vec::new();
    for i in 0..6 {
        let t = i as f64 * FRAME_MS;
        let d_index = if i < 4 { 0.02 } else { 0.5 };
        let out = p.tick(Some(&hand(t, 0.5, 0.5, d_index, 0.5)), t);
        per_frame.push(non_moves(&out.events));
    }

    assert!(per_frame[..3].iter().all(Vec::is_empty));
    assert!(matches!(per_frame[3][..], [PointerEvent::PointerDown { .. }]));
    assert!(per_frame[4].is_empty());
    let (down, click) = match (&per_frame[3][0], &per_frame[5][..]) {
        (PointerEvent::PointerDown { x, y }, [PointerEvent::Click { x: cx, y: cy }]) => {
            ((*x, *y), (*cx, *cy))
        }
        other => panic!("unexpected events {other:?}"),
    };
    assert!((down.0 - click.0).hypot(down.1 - click.1) < 5.0);
    assert!(p.interaction().is_idle());
}

#[test]
fn two_quick_pinches_double_click() {
    let mut p = Pipeline::new(&profile_1000());
    let mut clicks = Vec::new();
    // 4 pinched + 2 open frames per tap, 6 frames ~ 200 ms apart
    for i in 0..12 {
        let t = i as f64 * FRAME_MS;
        let d_index = if i % 6 < 4 { 0.02 } else { 0.5 };
        let out = p.tick(Some(&hand(t, 0.5, 0.5, d_index, 0.5)), t);
        clicks.extend(
            out.events
                .into_iter()
                .filter(|e| matches!(e, PointerEvent::Click { .. } | PointerEvent::DoubleClick { .. })),
        );
    }
    assert_eq!(clicks.len(), 2);
    assert!(matches!(clicks[0], PointerEvent::Click { .. }));
    assert!(matches!(clicks[1], PointerEvent::DoubleClick { .. }));
    assert!(!p.interaction().has_click_memory());
}

#[test]
fn secondary_pinch_right_clicks_even_when_moving() {
    let mut p = Pipeline::new(&profile_1000());
    let mut events = Vec::new();
    for i in 0..12 {
        let t = i as f64 * FRAME_MS;
        let (d_index, d_middle) = if i < 10 { (0.5, 0.02) } else { (0.5, 0.5) };
        // drift well beyond the drag threshold while pinched
        let ix = 0.3 + i as f32 * 0.03;
        events.extend(non_moves(&p.tick(Some(&hand(t, ix, 0.5, d_index, d_middle)), t).events));
    }
    assert!(matches!(events[0], PointerEvent::PointerDown { .. }));
    assert!(!events.iter().any(|e| matches!(e, PointerEvent::DragBegin { .. })));
    assert!(matches!(events.last(), Some(PointerEvent::SecondaryClick { .. })));
}

#[test]
fn primary_drag_scrolls_and_ends_without_click() {
    let mut p = Pipeline::new(&profile_1000());
    let mut events = Vec::new();
    for i in 0..24 {
        let t = i as f64 * FRAME_MS;
        let d_index = if i < 22 { 0.02 } else { 0.5 };
        let iy = if i < 4 { 0.3 } else { 0.7 };
        events.extend(non_moves(&p.tick(Some(&hand(t, 0.5, iy, d_index, 0.5)), t).events));
    }
    assert!(events.iter().any(|e| matches!(e, PointerEvent::DragBegin { .. })));
    let scrolled: f32 = events
        .iter()
        .filter_map(|e| match e {
            PointerEvent::Scroll { delta_y } => Some(*delta_y),
            _ => None,
        })
        .sum();
    // hand moved down, anchor minus current is negative
    assert!(scrolled < 0.0);
    assert!(matches!(
        events[events.len() - 2..],
        [PointerEvent::PointerUp { .. }, PointerEvent::DragEnd { .. }]
    ));
    assert!(!events.iter().any(|e| matches!(e, PointerEvent::Click { .. })));
}

#[test]
fn free_horizontal_sweep_swipes_once() {
    let mut profile = profile_1000();
    profile.swipe.enabled = true;
    let mut p = Pipeline::new(&profile);
    let mut swipes = Vec::new();
    // camera x 0.40 -> 0.10 is screen x 600 -> 900 after mirroring
    for i in 0..7 {
        let t = i as f64 * 200.0 / 6.0;
        let ix = 0.40 - 0.05 * i as f32;
        for e in p.tick(Some(&hand(t, ix, 0.5, 0.3, 0.3)), t).events {
            if let PointerEvent::Swipe { direction } = e {
                swipes.push(direction);
            }
        }
    }
    assert_eq!(swipes, vec![SwipeDirection::Right]);
}

#[test]
fn swipe_window_is_empty_while_engaged() {
    let mut profile = profile_1000();
    profile.swipe.enabled = true;
    let mut p = Pipeline::new(&profile);
    let mut swiped = false;
    for i in 0..20 {
        let t = i as f64 * FRAME_MS;
        let d_index = if (3..12).contains(&i) { 0.02 } else { 0.3 };
        let ix = 0.2 + 0.01 * i as f32;
        let out = p.tick(Some(&hand(t, ix, 0.5, d_index, 0.3)), t);
        swiped |= out
            .events
            .iter()
            .any(|e| matches!(e, PointerEvent::Swipe { .. }));
        if !p.interaction().is_idle() {
            assert_eq!(p.swipe().window_len(), 0, "frame {i}");
        }
    }
    assert!(!swiped);
}

#[test]
fn stop_is_silent_idempotent_and_clears_buffers() {
    let mut profile = profile_1000();
    profile.swipe.enabled = true;
    let mut p = Pipeline::new(&profile);
    for i in 0..6 {
        let t = i as f64 * FRAME_MS;
        p.tick(Some(&hand(t, 0.5, 0.5, 0.02, 0.5)), t);
    }
    assert!(!p.interaction().is_idle());

    p.stop();
    p.stop();
    assert!(p.interaction().is_idle());
    assert_eq!(p.stability().history_len(), 0);
    assert_eq!(p.swipe().window_len(), 0);
    assert!(p.tick(Some(&hand(300.0, 0.5, 0.5, 0.5, 0.5)), 300.0).events.is_empty());

    // a fresh session starts from scratch: no release click for the old pinch
    p.start();
    let out = p.tick(Some(&hand(333.0, 0.5, 0.5, 0.5, 0.5)), 333.0);
    assert!(non_moves(&out.events).is_empty());
}

#[test]
fn hover_observer_sees_smoothed_position() {
    let regions = RectRegions::new().with(1, [400.0, 400.0, 200.0, 200.0]);
    let mut p = Pipeline::new(&profile_1000()).with_hover(HoverTracker::new(Box::new(regions)));
    let out = p.tick(Some(&hand(0.0, 0.5, 0.5, 0.3, 0.3)), 0.0);
    assert!(matches!(out.hover[..], [HoverEvent::Enter(1), HoverEvent::Move(1, _)]));
    // no hand: hover state is left alone
    assert!(p.tick(None, FRAME_MS).hover.is_empty());
}

#[test]
fn replay_treats_bad_lines_as_missing_hands() {
    let mut lines = Vec::new();
    for i in 0..4 {
        lines.push(frame_json(i as f64 * FRAME_MS, 0.02));
    }
    lines.push("{ not json".to_string());
    lines.push(r#"{"t_ms": 170, "landmarks": [[0.5, 0.5]]}"#.to_string());
    lines.push("# comment".to_string());
    let input = lines.join("\n");

    let mut p = Pipeline::new(&profile_1000());
    let mut sink = JsonLinesSink::new(Vec::new());
    let summary = ingest::replay(&mut p, input.as_bytes(), &mut sink).unwrap();
    assert_eq!(summary.frames, 6);

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let kinds: Vec<String> = text
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .filter(|k| k != "pointer_move")
        .collect();
    assert_eq!(kinds, vec!["pointer_down", "click"]);
}

#[test]
fn garbled_release_line_does_not_pair_with_an_old_click() {
    let mut p = Pipeline::new(&profile_1000());
    let mut clock = ingest::FrameClock::default();
    let mut events: Vec<PointerEvent> = Vec::new();

    // producer clock runs far ahead of the daemon's local clock
    for i in 0..6 {
        let t = 1_000_000.0 + i as f64 * FRAME_MS;
        let d_index = if i < 4 { 0.02 } else { 0.5 };
        ingest::feed_line(&mut p, &mut clock, &frame_json(t, d_index), i as f64 * FRAME_MS, &mut events);
    }
    // five seconds later, the second tap's last release line is unreadable
    for i in 0..6 {
        let t = 1_005_000.0 + i as f64 * FRAME_MS;
        let local = 5_000.0 + i as f64 * FRAME_MS;
        let line = match i {
            0..4 => frame_json(t, 0.02),
            4 => frame_json(t, 0.5),
            _ => "{garbled".to_string(),
        };
        ingest::feed_line(&mut p, &mut clock, &line, local, &mut events);
    }

    let clicks: Vec<PointerEvent> = events
        .into_iter()
        .filter(|e| matches!(e, PointerEvent::Click { .. } | PointerEvent::DoubleClick { .. }))
        .collect();
    assert_eq!(
        clicks,
        vec![
            PointerEvent::Click { x: 500.0, y: 500.0 },
            PointerEvent::Click { x: 500.0, y: 500.0 },
        ]
    );
}

#[test]
fn lines_without_timestamps_follow_the_producer_clock() {
    let mut p = Pipeline::new(&profile_1000());
    let mut clock = ingest::FrameClock::default();
    let mut sink: Vec<PointerEvent> = Vec::new();
    ingest::feed_line(&mut p, &mut clock, &frame_json(2_000_000.0, 0.5), 10.0, &mut sink);
    ingest::feed_line(&mut p, &mut clock, r#"{"landmarks": null}"#, 43.0, &mut sink);
    assert_eq!(clock.estimate(43.0), 2_000_033.0);
}

fn frame_json(t_ms: f64, d_index: f32) -> String {
    let f = hand(t_ms, 0.5, 0.5, d_index, 0.5);
    let pts: Vec<String> = f
        .points
        .iter()
        .map(|p| format!("[{},{}]", p.x, p.y))
        .collect();
    format!(r#"{{"t_ms": {t_ms}, "landmarks": [{}]}}"#, pts.join(","))
}
