//! Site registry behaviour through the stage mover: ID reuse, sites files
//! and visit ordering.

mod common;

use common::{RecordingPositioner, mover_over, record};
use stage_common::axis::Axis;
use stage_common::events::{EventBus, StageEvent};
use stage_common::limits::Limits;
use stage_mover::{StageError, StageMover};
use std::fs;
use tempfile::TempDir;

fn stage(bus: &EventBus) -> StageMover {
    let limits = Limits::new(-1_000.0, 1_000.0);
    mover_over(
        bus,
        vec![
            RecordingPositioner::new(bus, "x", Axis::X, limits, 0.0),
            RecordingPositioner::new(bus, "y", Axis::Y, limits, 0.0),
            RecordingPositioner::new(bus, "z", Axis::Z, limits, 0.0),
        ],
    )
}

fn save_n(mover: &StageMover, n: usize) {
    for i in 0..n {
        let site = mover.create_site([i as f64 * 10.0, 0.0, 0.0]);
        mover.save_site(site);
    }
}

#[test]
fn test_deleting_most_recent_site_reuses_its_id() {
    let bus = EventBus::new();
    let mover = stage(&bus);
    save_n(&mover, 5);

    mover.delete_site(5).unwrap();
    let site = mover.save_current_position().unwrap();
    assert_eq!(site.id, 5);
}

#[test]
fn test_deleting_older_site_keeps_counter() {
    let bus = EventBus::new();
    let mover = stage(&bus);
    save_n(&mover, 5);

    mover.delete_site(3).unwrap();
    let site = mover.save_current_position().unwrap();
    assert_eq!(site.id, 6);
    assert!(matches!(mover.delete_site(3), Err(StageError::SiteNotFound(3))));
}

#[test]
fn test_write_then_load_into_fresh_mover() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sites.txt");

    let bus = EventBus::new();
    let mover = stage(&bus);
    let site = mover.create_site([12.5, -3.0, 7.0]);
    mover.save_site(site.with_group("slide-1").with_color([255, 0, 0]));
    save_n(&mover, 2);
    mover.write_sites_to_file(&path).unwrap();

    let other_bus = EventBus::new();
    let other = stage(&other_bus);
    let seen = record(&other_bus);
    assert_eq!(other.load_sites(&path).unwrap(), 3);
    assert_eq!(other.all_sites(), mover.all_sites());
    assert_eq!(
        seen.lock()
            .iter()
            .filter(|e| matches!(e, StageEvent::SiteCreated(_)))
            .count(),
        3
    );

    // The counter follows the loaded IDs.
    assert_eq!(other.create_site([0.0; 3]).id, 4);
}

#[test]
fn test_load_with_bad_line_saves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sites.txt");
    fs::write(
        &path,
        "0,0,0,None,0,255,0,25.00,1\n0,0,0,None,0,300,0,25.00,2\n",
    )
    .unwrap();

    let bus = EventBus::new();
    let mover = stage(&bus);
    let err = mover.load_sites(&path).unwrap_err();
    assert!(matches!(err, StageError::SiteParse { line: 2, .. }));
    assert!(mover.all_sites().is_empty());
}

#[test]
fn test_missing_sites_file() {
    let bus = EventBus::new();
    let mover = stage(&bus);
    let err = mover.load_sites(std::path::Path::new("/nonexistent/sites.txt")).unwrap_err();
    assert!(matches!(err, StageError::Io(_)));
}

#[test]
fn test_reachability_uses_soft_limits() {
    let bus = EventBus::new();
    let mover = stage(&bus);
    let inside = mover.create_site([999.0, -1_000.0, 0.0]);
    let outside = mover.create_site([0.0, 0.0, 1_000.5]);
    mover.save_site(inside.clone());
    mover.save_site(outside.clone());
    assert!(mover.can_reach_site(inside.id).unwrap());
    assert!(!mover.can_reach_site(outside.id).unwrap());

    assert!(mover.set_soft_max(Axis::X, 500.0));
    assert!(!mover.can_reach_site(inside.id).unwrap());
}

#[test]
fn test_three_site_tour_keeps_given_order() {
    let bus = EventBus::new();
    let mover = stage(&bus);
    for p in [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0]] {
        let site = mover.create_site(p);
        mover.save_site(site);
    }
    assert_eq!(mover.optimized_site_order(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
    assert!(mover.optimized_site_order(&[]).unwrap().is_empty());
    assert_eq!(mover.optimized_site_order(&[2]).unwrap(), vec![2]);
}

#[test]
fn test_tour_follows_file_order_on_equal_cost() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sites.txt");
    fs::write(
        &path,
        "10,10,0,None,0,255,0,25.00,3\n10,0,0,None,0,255,0,25.00,2\n0,0,0,None,0,255,0,25.00,1\n",
    )
    .unwrap();

    let bus = EventBus::new();
    let mover = stage(&bus);
    let ids = mover.load_sites_in_order(&path).unwrap();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(mover.optimized_site_order(&ids).unwrap(), vec![3, 2, 1]);

    // Ascending IDs are a different, equally cheap tour.
    assert_eq!(mover.optimized_site_order(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
}
