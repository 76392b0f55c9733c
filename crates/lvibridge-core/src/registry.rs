// ── Device registry ──
//
// Holds the homes/rooms/devices snapshot and resolves bus addresses to
// devices. A resync builds a complete new snapshot before swapping it in;
// the old one is never patched.

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::gateway::VendorGateway;
use crate::inclusion::InclusionReport;
use crate::model::{Device, DeviceIndex, Room, Snapshot};
use crate::session::Session;

/// Strip bus-side decorations from a device address.
///
/// Trailing `_0` channel suffixes and leading `l` prefixes are removed,
/// so `l4411_0` and `4411` name the same device. Applying it twice gives
/// the same result as applying it once.
pub fn normalize_address(address: &str) -> &str {
    address.trim_end_matches("_0").trim_start_matches('l')
}

/// Owns the current snapshot.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    snapshot: Snapshot,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Swap in a complete snapshot.
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }

    pub fn clear(&mut self) {
        self.snapshot = Snapshot::default();
    }

    // ── Resync ───────────────────────────────────────────────────────

    /// Rebuild the snapshot from the vendor API.
    ///
    /// Best effort: a failing listing call is logged and contributes
    /// nothing, the rest of the walk continues. Fails only when there is
    /// no access token to list with.
    pub async fn resync_all<G: VendorGateway>(
        &mut self,
        gateway: &G,
        session: &Session,
    ) -> Result<&Snapshot, CoreError> {
        let token = session
            .access_token()
            .ok_or_else(|| CoreError::auth("resync requires an authenticated session"))?;

        let homes = unwrap_or_empty("homes", gateway.list_homes(token).await);
        let mut rooms: Vec<Room> = Vec::new();
        let mut devices: Vec<Device> = Vec::new();

        for home in &homes {
            let home_rooms = unwrap_or_empty(
                &format!("rooms of home {}", home.id),
                gateway.list_rooms(token, &home.id).await,
            );
            for room in &home_rooms {
                devices.extend(unwrap_or_empty(
                    &format!("devices of room {}", room.zone_id),
                    gateway
                        .list_room_devices(token, &home.id, &room.zone_id)
                        .await,
                ));
            }
            rooms.extend(home_rooms);

            devices.extend(unwrap_or_empty(
                &format!("independent devices of home {}", home.id),
                gateway.list_independent_devices(token, &home.id).await,
            ));
        }

        info!(
            homes = homes.len(),
            rooms = rooms.len(),
            devices = devices.len(),
            "registry resynchronized"
        );
        let snapshot = Snapshot {
            homes,
            rooms,
            devices,
        };
        if snapshot.is_empty() {
            warn!("vendor listed nothing, registry is now empty");
        }
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Find a device by bus address.
    pub fn resolve(&self, address: &str) -> Option<DeviceIndex> {
        let wanted = normalize_address(address);
        if wanted.is_empty() {
            return None;
        }
        self.snapshot
            .devices
            .iter()
            .position(|d| normalize_address(&d.id) == wanted)
            .map(DeviceIndex::new)
    }

    pub fn get(&self, index: DeviceIndex) -> Option<&Device> {
        self.snapshot.devices.get(index.get())
    }

    /// Resolve and fetch in one step.
    pub fn find(&self, address: &str) -> Option<&Device> {
        self.resolve(address).and_then(|idx| self.get(idx))
    }

    /// Capability descriptor for the device at `index`.
    pub fn inclusion_report(&self, index: DeviceIndex, adapter: &str) -> Option<InclusionReport> {
        self.get(index)
            .map(|device| InclusionReport::for_device(device, adapter))
    }

    // ── Hierarchy ────────────────────────────────────────────────────

    pub fn rooms_of<'a>(&'a self, home_id: &'a str) -> impl Iterator<Item = &'a Room> + 'a {
        self.snapshot
            .rooms
            .iter()
            .filter(move |r| r.home_id == home_id)
    }

    pub fn devices_in<'a>(&'a self, room_id: &'a str) -> impl Iterator<Item = &'a Device> + 'a {
        self.snapshot
            .devices
            .iter()
            .filter(move |d| d.room_id.as_deref() == Some(room_id))
    }

    pub fn independent_devices(&self) -> impl Iterator<Item = &Device> {
        self.snapshot.devices.iter().filter(|d| d.is_independent())
    }
}

/// Unwrap a listing result, logging failures and treating them as empty.
fn unwrap_or_empty<T>(what: &str, result: Result<Vec<T>, CoreError>) -> Vec<T> {
    match result {
        Ok(items) => {
            debug!(count = items.len(), "listed {what}");
            items
        }
        Err(e) => {
            warn!("listing {what} failed: {e}, treating as empty");
            Vec::new()
        }
    }
}
