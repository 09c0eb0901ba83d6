//! Headless render device selection.
//!
//! Cards are looked up through the DRM sysfs tree: `cardN/device/enable`
//! marks a usable card, the `cardN/device/driver` symlink names its kernel
//! driver and `cardN/device/vendor` holds the PCI vendor id the wgpu
//! adapter is matched against. Nothing here fails; a missing or unreadable
//! entry just makes a card less attractive.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Driver preferred when several cards are viable.
pub const PREFERRED_DRIVER: &str = "i915";

/// Cards `card0..card{MAX_CARDS-1}` are probed.
pub const MAX_CARDS: u32 = 4;

/// A chosen render node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDevice {
    /// Device node, e.g. `/dev/dri/card0`.
    pub path: PathBuf,
    /// Kernel driver name, when known.
    pub driver: Option<String>,
    /// PCI vendor id, when known.
    pub vendor_id: Option<u32>,
}

/// Source of per-card facts.
pub trait DriverProbe {
    /// Device node of card `index`.
    fn card_path(&self, index: u32) -> PathBuf;

    /// True when the card exists and is enabled.
    fn is_viable(&self, card: &Path) -> bool;

    /// Kernel driver bound to the card.
    fn driver(&self, card: &Path) -> Option<String>;

    /// PCI vendor id of the card.
    fn vendor_id(&self, card: &Path) -> Option<u32>;
}

/// [`DriverProbe`] reading `/sys/class/drm`.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    dev_root: PathBuf,
    sys_root: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::with_roots("/dev/dri", "/sys/class/drm")
    }
}

impl SysfsProbe {
    /// Probe of the live system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe rooted elsewhere, for tests and chroots.
    pub fn with_roots(dev_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self { dev_root: dev_root.into(), sys_root: sys_root.into() }
    }

    /// `<sys_root>/cardN/device` for a device node named `cardN`.
    fn device_dir(&self, card: &Path) -> Option<PathBuf> {
        let name = card.file_name()?;
        Some(self.sys_root.join(name).join("device"))
    }
}

impl DriverProbe for SysfsProbe {
    fn card_path(&self, index: u32) -> PathBuf {
        self.dev_root.join(format!("card{index}"))
    }

    fn is_viable(&self, card: &Path) -> bool {
        let Some(dir) = self.device_dir(card) else {
            return false;
        };
        // nouveau writes 2, others 1
        fs::read_to_string(dir.join("enable"))
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .is_some_and(|v| v > 0)
    }

    fn driver(&self, card: &Path) -> Option<String> {
        let link = fs::read_link(self.device_dir(card)?.join("driver")).ok()?;
        Some(link.file_name()?.to_string_lossy().into_owned())
    }

    fn vendor_id(&self, card: &Path) -> Option<u32> {
        let raw = fs::read_to_string(self.device_dir(card)?.join("vendor")).ok()?;
        let raw = raw.trim();
        u32::from_str_radix(raw.strip_prefix("0x").unwrap_or(raw), 16).ok()
    }
}

/// Viable cards among `card0..card3`, in index order.
pub fn viable_cards(probe: &dyn DriverProbe) -> Vec<PathBuf> {
    (0..MAX_CARDS).map(|i| probe.card_path(i)).filter(|c| probe.is_viable(c)).collect()
}

/// First card driven by `preferred_driver`, else the first card.
///
/// Returns `None` for an empty list.
pub fn choose_best_card(cards: &[PathBuf], probe: &dyn DriverProbe, preferred_driver: &str) -> Option<PathBuf> {
    let preferred = cards
        .iter()
        .find(|card| probe.driver(card).as_deref() == Some(preferred_driver));
    preferred.or_else(|| cards.first()).cloned()
}

/// Picks the render device for a headless run.
///
/// `requested` wins when it exists and opens read/write; otherwise the best
/// viable card is chosen. `None` leaves adapter choice to wgpu.
pub fn select_render_device(
    requested: Option<&Path>,
    probe: &dyn DriverProbe,
    preferred_driver: &str,
) -> Option<RenderDevice> {
    let describe = |path: PathBuf| RenderDevice {
        driver: probe.driver(&path),
        vendor_id: probe.vendor_id(&path),
        path,
    };

    if let Some(path) = requested {
        match fs::OpenOptions::new().read(true).write(true).open(path) {
            Ok(_) => {
                info!(path = %path.display(), "using requested render device");
                return Some(describe(path.to_path_buf()));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot open render device, auto-selecting"),
        }
    }

    let cards = viable_cards(probe);
    debug!(?cards, "viable cards");
    match choose_best_card(&cards, probe, preferred_driver) {
        Some(card) => {
            let device = describe(card);
            info!(path = %device.path.display(), driver = ?device.driver, "render device selected");
            Some(device)
        }
        None => {
            warn!("no viable render device found, using default adapter");
            None
        }
    }
}
