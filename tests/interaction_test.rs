use std::time::Duration;

use cgmath::Deg;
use flow_gallery::{
    data_structures::entity::EntityKind,
    flow::Control,
    input::{Axis, ClickTracker, Command, Motion},
    pick::pick_entity,
};

use crate::common::test_utils::{centre_of, entity_at, load_gallery};

mod common;

#[test]
fn clicking_the_statue_selects_it_every_time() {
    let (mut gallery, _) = load_gallery("gallery.csv");
    gallery.camera.yaw = Deg(90.0);
    let (x, y) = centre_of(&gallery);
    for _ in 0..3 {
        let hit = pick_entity(
            &gallery.scene,
            &gallery.camera,
            &gallery.projection,
            &gallery.viewport(),
            x,
            y,
        );
        assert_eq!(hit, Some(1));
    }
    gallery.handle(Command::Pick { x, y });
    assert_eq!(gallery.scene.selected(), Some(1));
    assert!(gallery.window_title().ends_with("Selected: statue (#1)"));
}

#[test]
fn nearest_exhibit_wins() {
    let (mut gallery, _) = load_gallery("header_only.csv");
    let eye_z = gallery.camera.eye().z;
    gallery.scene.entities.push(entity_at(EntityKind::Other("far".into()), [4.0, 0.0, eye_z]));
    gallery.scene.entities.push(entity_at(EntityKind::Other("near".into()), [2.0, 0.0, eye_z]));
    let (x, y) = centre_of(&gallery);
    gallery.handle(Command::Pick { x, y });
    assert_eq!(gallery.scene.selected(), Some(1));
}

#[test]
fn clicks_outside_the_viewport_clear_the_selection() {
    let (mut gallery, _) = load_gallery("gallery.csv");
    gallery.resize(1000, 600);
    gallery.camera.yaw = Deg(90.0);
    let (x, y) = centre_of(&gallery);
    gallery.handle(Command::Pick { x, y });
    assert_eq!(gallery.scene.selected(), Some(1));
    // Inside the left letterbox bar.
    gallery.handle(Command::Pick { x: 20.0, y });
    assert_eq!(gallery.scene.selected(), None);
}

#[test]
fn statue_clicks_pause_and_resume_the_animation() {
    let (mut gallery, _) = load_gallery("gallery.csv");
    gallery.camera.yaw = Deg(90.0);
    let (x, y) = centre_of(&gallery);

    gallery.update(Duration::from_secs(1));
    let spun = gallery.scene.entities[1].anim_angle;
    assert!((spun - 20.0).abs() < 1e-3);

    gallery.handle(Command::Pick { x, y });
    assert!(!gallery.scene.animation_enabled);
    gallery.update(Duration::from_secs(1));
    assert_eq!(gallery.scene.entities[1].anim_angle, spun);

    gallery.handle(Command::Pick { x, y });
    assert!(gallery.scene.animation_enabled);
    gallery.update(Duration::from_secs(1));
    assert!((gallery.scene.entities[1].anim_angle - 40.0).abs() < 1e-3);
}

#[test]
fn walking_keeps_eye_height() {
    let (mut gallery, _) = load_gallery("header_only.csv");
    gallery.handle(Command::ToggleWalkMode);
    gallery.handle(Command::Move(Axis::Vertical, Motion::Positive));
    gallery.handle(Command::Move(Axis::Forward, Motion::Positive));
    gallery.update(Duration::from_millis(500));
    assert!((gallery.camera.position.z - gallery.config().camera.eye_height).abs() < 1e-4);
    assert!(gallery.camera.position.x > 0.0);
}

#[test]
fn drags_do_not_pick() {
    let mut clicks = ClickTracker::new(3.0);
    clicks.press(400.0, 300.0);
    assert_eq!(clicks.release(420.0, 300.0), None);
}

#[test]
fn escape_quits() {
    let (mut gallery, _) = load_gallery("header_only.csv");
    assert_eq!(gallery.handle(Command::ToggleHelp), Control::Continue);
    assert_eq!(gallery.handle(Command::Quit), Control::Exit);
}
