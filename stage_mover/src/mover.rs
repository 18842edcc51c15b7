//! The stage mover facade.
//!
//! [`StageMover`] owns the axis stacks, the motion coordinator and the site
//! registry, and is the only thing the rest of an application talks to for
//! stage motion. It has an explicit lifecycle:
//!
//! ```text
//! new / from_config ──► initialize ──► … operations … ──► shutdown
//! ```
//!
//! `initialize` subscribes to positioner notifications on the event bus:
//! `DeviceMoved` is republished as an aggregate `PositionChanged`, and
//! `DeviceStopped` releases blocking moves. `shutdown` removes the
//! subscription again.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use stage_common::axis::Axis;
use stage_common::consts::NUM_AXES;
use stage_common::events::{EventBus, StageEvent, SubscriptionId};
use stage_common::hal::driver::PositionerHandle;
use stage_common::limits::{LimitBound, Limits};
use stage_common::site::{Site, SiteId};
use stage_hal::DriverRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::StageConfig;
use crate::error::{StageError, StageResult};
use crate::motion::{MotionCoordinator, MotionSettings};
use crate::registry::AxisRegistry;
use crate::route;
use crate::sites::{SiteRegistry, read_sites_file};

/// Point-in-time view of the stage, for display and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    /// Aggregate position.
    pub position: [f64; NUM_AXES],
    /// Per-depth positioner positions.
    pub all_positions: Vec<[Option<f64>; NUM_AXES]>,
    /// Summed hard limits per axis.
    pub hard_limits: [Limits; NUM_AXES],
    /// Summed soft limits per axis.
    pub soft_limits: [Limits; NUM_AXES],
    /// Control depth.
    pub control_depth: usize,
    /// Step sizes at the control depth.
    pub step_sizes: [Option<f64>; NUM_AXES],
    /// Number of saved sites.
    pub site_count: usize,
}

/// Stage motion, site and routing facade.
pub struct StageMover {
    motion: Arc<MotionCoordinator>,
    sites: Mutex<SiteRegistry>,
    site_offset: RwLock<[f64; NUM_AXES]>,
    bus: EventBus,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl StageMover {
    /// Mover over already-built positioners.
    ///
    /// # Errors
    /// `MissingAxis` if any axis has no positioner.
    pub fn new(
        handles: Vec<Arc<dyn PositionerHandle>>,
        config: &StageConfig,
        bus: EventBus,
    ) -> StageResult<Self> {
        let registry = AxisRegistry::new(handles)?;
        let motion_config = config.motion.clone();
        let motion = MotionCoordinator::new(
            registry,
            MotionSettings::from(&config.motion),
            move |depth| motion_config.step_size_for_depth(depth),
            bus.clone(),
        );
        Ok(Self {
            motion: Arc::new(motion),
            sites: Mutex::new(SiteRegistry::new(
                config.sites.default_color,
                config.sites.default_size,
            )),
            site_offset: RwLock::new([0.0; NUM_AXES]),
            bus,
            subscription: Mutex::new(None),
        })
    }

    /// Validate `config`, build its positioners through `drivers`, and create
    /// the mover.
    pub fn from_config(
        config: &StageConfig,
        drivers: &DriverRegistry,
        bus: EventBus,
    ) -> StageResult<Self> {
        config.validate()?;
        let handles = drivers
            .create_all(&config.positioners, &bus)
            .map_err(StageError::Driver)?;
        Self::new(handles, config, bus)
    }

    /// Subscribe to positioner notifications. Calling it twice is harmless.
    pub fn initialize(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }

        let motion = Arc::downgrade(&self.motion);
        let bus = self.bus.downgrade();
        let id = self.bus.subscribe(move |event| {
            let Some(motion) = motion.upgrade() else {
                return;
            };
            match event {
                StageEvent::DeviceMoved { axis, .. } => {
                    match motion.registry().position_for_axis(*axis) {
                        Ok(position) => {
                            bus.publish(StageEvent::PositionChanged {
                                axis: *axis,
                                position,
                            });
                        }
                        Err(e) => warn!("Failed to read position of axis {}: {}", axis, e),
                    }
                }
                StageEvent::DeviceStopped { device } => {
                    motion.stops().notify_stopped(device);
                }
                _ => {}
            }
        });
        *subscription = Some(id);
        info!("Stage mover initialized");
    }

    /// Drop the bus subscription.
    pub fn shutdown(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.bus.unsubscribe(id);
            info!("Stage mover shut down");
        }
    }

    /// Whether `initialize` has run without a matching `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The motion coordinator.
    pub fn motion(&self) -> &MotionCoordinator {
        &self.motion
    }

    /// The positioner stacks.
    pub fn registry(&self) -> &AxisRegistry {
        self.motion.registry()
    }

    /// Publish everything a freshly attached display needs: per axis the
    /// position, both soft limits and the current step size.
    pub fn make_initial_publications(&self) -> StageResult<()> {
        let step_sizes = self.motion.cur_step_sizes();
        for axis in Axis::ALL {
            let position = self.registry().position_for_axis(axis)?;
            self.bus.publish(StageEvent::PositionChanged { axis, position });

            let limits = self.registry().soft_limits_for_axis(axis);
            for bound in [LimitBound::Min, LimitBound::Max] {
                self.bus.publish(StageEvent::SoftLimitChanged {
                    axis,
                    value: limits.bound(bound),
                    bound,
                });
            }

            if let Some(step) = step_sizes[axis.index()] {
                self.bus.publish(StageEvent::StepSizeChanged { axis, step });
            }
        }
        Ok(())
    }

    // ─── Positions & limits ─────────────────────────────────────────

    /// Aggregate stage position.
    pub fn position(&self) -> StageResult<[f64; NUM_AXES]> {
        self.registry().position()
    }

    /// Aggregate position of one axis.
    pub fn position_for_axis(&self, axis: Axis) -> StageResult<f64> {
        self.registry().position_for_axis(axis)
    }

    /// Per-depth positioner positions.
    pub fn all_positions(&self) -> StageResult<Vec<[Option<f64>; NUM_AXES]>> {
        self.registry().all_positions()
    }

    /// Summed hard limits per axis.
    pub fn hard_limits(&self) -> [Limits; NUM_AXES] {
        self.registry().hard_limits()
    }

    /// Summed soft limits per axis.
    pub fn soft_limits(&self) -> [Limits; NUM_AXES] {
        self.registry().soft_limits()
    }

    /// Change a soft limit on the coarsest positioner of an axis.
    ///
    /// Returns `false`, publishing nothing, if the positioner refuses.
    pub fn set_soft_limit(&self, axis: Axis, value: f64, bound: LimitBound) -> bool {
        let Some(handler) = self.registry().handler_at(axis, 0) else {
            return false;
        };
        match handler.set_soft_limit(value, bound) {
            Ok(()) => {
                self.bus
                    .publish(StageEvent::SoftLimitChanged { axis, value, bound });
                true
            }
            Err(e) => {
                warn!("Soft limit not set on {}: {}", handler.name(), e);
                false
            }
        }
    }

    /// Change the lower soft limit of an axis.
    pub fn set_soft_min(&self, axis: Axis, value: f64) -> bool {
        self.set_soft_limit(axis, value, LimitBound::Min)
    }

    /// Change the upper soft limit of an axis.
    pub fn set_soft_max(&self, axis: Axis, value: f64) -> bool {
        self.set_soft_limit(axis, value, LimitBound::Max)
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// See [`MotionCoordinator::go_to`].
    pub fn go_to(&self, position: &[f64], block: bool) -> StageResult<()> {
        self.motion.go_to(position, block)
    }

    /// See [`MotionCoordinator::go_to_xy`].
    pub fn go_to_xy(&self, position: &[f64], block: bool) -> StageResult<()> {
        self.motion.go_to_xy(position, block)
    }

    /// See [`MotionCoordinator::go_to_z`].
    pub fn go_to_z(&self, position: f64, block: bool) -> StageResult<()> {
        self.motion.go_to_z(position, block)
    }

    /// See [`MotionCoordinator::move_relative`].
    pub fn move_relative(&self, delta: &[f64], block: bool) -> StageResult<()> {
        self.motion.move_relative(delta, block)
    }

    /// See [`MotionCoordinator::step`].
    pub fn step(&self, multipliers: [i32; NUM_AXES]) -> StageResult<()> {
        self.motion.step(multipliers)
    }

    /// See [`MotionCoordinator::wait_for_stop`].
    pub fn wait_for_stop(&self, timeout: Option<Duration>) -> StageResult<()> {
        self.motion.wait_for_stop(timeout)
    }

    /// See [`MotionCoordinator::change_mover`].
    pub fn change_mover(&self) {
        self.motion.change_mover()
    }

    /// See [`MotionCoordinator::change_step_size`].
    pub fn change_step_size(&self, direction: i32) -> StageResult<()> {
        self.motion.change_step_size(direction)
    }

    /// See [`MotionCoordinator::cur_step_sizes`].
    pub fn cur_step_sizes(&self) -> [Option<f64>; NUM_AXES] {
        self.motion.cur_step_sizes()
    }

    /// See [`MotionCoordinator::control_depth`].
    pub fn control_depth(&self) -> usize {
        self.motion.control_depth()
    }

    /// See [`MotionCoordinator::recenter_fine_motion`].
    pub fn recenter_fine_motion(&self) -> StageResult<()> {
        self.motion.recenter_fine_motion()
    }

    // ─── Sites ──────────────────────────────────────────────────────

    /// Offset added to site positions by [`go_to_site`](Self::go_to_site),
    /// e.g. the active objective's parfocal offset.
    pub fn set_site_offset(&self, offset: [f64; NUM_AXES]) {
        *self.site_offset.write() = offset;
    }

    /// Current site offset.
    pub fn site_offset(&self) -> [f64; NUM_AXES] {
        *self.site_offset.read()
    }

    /// New unsaved site with the next ID.
    pub fn create_site(&self, position: [f64; NUM_AXES]) -> Site {
        self.sites.lock().create_site(position)
    }

    /// Save a site and announce it.
    pub fn save_site(&self, site: Site) {
        self.sites.lock().save_site(site.clone());
        self.bus.publish(StageEvent::SiteCreated(site));
    }

    /// Save the current stage position as a new default site.
    pub fn save_current_position(&self) -> StageResult<Site> {
        let position = self.position()?;
        let site = self.create_site(position);
        self.save_site(site.clone());
        Ok(site)
    }

    /// Remove a site and announce it.
    pub fn delete_site(&self, id: SiteId) -> StageResult<Site> {
        let site = self.sites.lock().delete_site(id)?;
        self.bus.publish(StageEvent::SiteDeleted(site.clone()));
        Ok(site)
    }

    /// Look up a site.
    pub fn site(&self, id: SiteId) -> StageResult<Site> {
        self.sites
            .lock()
            .site(id)
            .cloned()
            .ok_or(StageError::SiteNotFound(id))
    }

    /// All sites in ascending ID order.
    pub fn all_sites(&self) -> Vec<Site> {
        self.sites.lock().all_sites().cloned().collect()
    }

    /// Whether a site exists.
    pub fn does_site_exist(&self, id: SiteId) -> bool {
        self.sites.lock().does_site_exist(id)
    }

    /// Whether every coordinate of a site lies inside the soft limits.
    pub fn can_reach_site(&self, id: SiteId) -> StageResult<bool> {
        let site = self.site(id)?;
        let limits = self.soft_limits();
        Ok(site
            .position
            .iter()
            .zip(limits.iter())
            .all(|(pos, lim)| lim.contains(*pos)))
    }

    /// Move to a site (plus the site offset) and announce arrival.
    pub fn go_to_site(&self, id: SiteId, block: bool) -> StageResult<()> {
        let site = self.site(id)?;
        let offset = self.site_offset();
        let target: Vec<f64> = site
            .position
            .iter()
            .zip(offset.iter())
            .map(|(p, o)| p + o)
            .collect();
        self.go_to(&target, block)?;
        info!("Arrived at site {}", site.id);
        self.bus.publish(StageEvent::ArrivedAtSite(site));
        Ok(())
    }

    /// Order in which to visit `ids`; see [`route::optimized_order`].
    pub fn optimized_site_order(&self, ids: &[SiteId]) -> StageResult<Vec<SiteId>> {
        let sites = self.sites.lock();
        let points = ids
            .iter()
            .map(|&id| {
                sites
                    .site(id)
                    .map(|s| (id, s.position))
                    .ok_or(StageError::SiteNotFound(id))
            })
            .collect::<StageResult<Vec<_>>>()?;
        drop(sites);
        Ok(route::optimized_order(&points))
    }

    /// Write every site to a file.
    pub fn write_sites_to_file(&self, path: &Path) -> StageResult<()> {
        let contents = self.sites.lock().to_file_contents()?;
        std::fs::write(path, contents)?;
        info!("Wrote sites to {}", path.display());
        Ok(())
    }

    /// Load a sites file, saving (and announcing) every site in it.
    ///
    /// Nothing is saved if any line fails to parse. Returns the number of
    /// sites loaded.
    pub fn load_sites(&self, path: &Path) -> StageResult<usize> {
        self.load_sites_in_order(path).map(|ids| ids.len())
    }

    /// As [`load_sites`](Self::load_sites), returning the loaded IDs in the
    /// order they appear in the file.
    pub fn load_sites_in_order(&self, path: &Path) -> StageResult<Vec<SiteId>> {
        let loaded = read_sites_file(path)?;
        let ids: Vec<SiteId> = loaded.iter().map(|site| site.id).collect();
        for site in loaded {
            self.save_site(site);
        }
        info!("Loaded {} sites from {}", ids.len(), path.display());
        Ok(ids)
    }

    /// Point-in-time view of the stage.
    pub fn snapshot(&self) -> StageResult<StageSnapshot> {
        Ok(StageSnapshot {
            position: self.position()?,
            all_positions: self.all_positions()?,
            hard_limits: self.hard_limits(),
            soft_limits: self.soft_limits(),
            control_depth: self.control_depth(),
            step_sizes: self.cur_step_sizes(),
            site_count: self.sites.lock().len(),
        })
    }
}

impl Drop for StageMover {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StageMover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageMover")
            .field("registry", self.registry())
            .field("control_depth", &self.control_depth())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
