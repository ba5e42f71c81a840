//! The on-device access controller: pins allow-list-vs-deny-list policy
//! on top of the mechanical range-file reader, and is the seam tests
//! fake out instead of touching real files.

use crate::rangefile::RangeFile;
use crate::token::LocationToken;
use crate::AccessError;
use std::path::Path;

/// Capability trait for the on-device geofence lookup: one production
/// implementation over a real range file, with a fake for tests so the
/// orchestrator never needs to touch the filesystem to exercise its own
/// logic.
pub trait AccessController: Send + Sync {
    /// The S2 level this controller's backing file is declared at.
    fn level(&self) -> u8;

    fn token_for(&self, lat: f64, lon: f64) -> LocationToken {
        LocationToken::new(lat, lon, self.level())
    }

    fn is_allowed(&self, token: LocationToken) -> bool;
}

/// Production implementation backed by a real [`RangeFile`].
pub struct OnDeviceController {
    range_file: RangeFile,
}

impl OnDeviceController {
    pub fn open(path: &Path) -> Result<Self, AccessError> {
        let range_file = RangeFile::open(path)?;
        Ok(OnDeviceController { range_file })
    }

    pub fn close(self) {
        self.range_file.close();
    }
}

impl AccessController for OnDeviceController {
    fn level(&self) -> u8 {
        self.range_file.level()
    }

    fn is_allowed(&self, token: LocationToken) -> bool {
        debug_assert_eq!(
            token.level(),
            self.level(),
            "token projected at a different level than this controller's file"
        );
        let found = self.range_file.find(token.cell_id()).is_some();
        // is_allowed_list: verdict is "found"; deny-list: verdict is "not found".
        self.range_file.is_allowed_list() == found
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fakes {
    use super::*;
    use std::collections::HashSet;

    /// An in-memory stand-in for [`OnDeviceController`], used by
    /// `orchestrator`'s tests so they never touch the filesystem.
    pub struct FakeAccessController {
        level: u8,
        is_allow_list: bool,
        listed_cells: HashSet<u64>,
    }

    impl FakeAccessController {
        pub fn new(level: u8, is_allow_list: bool, listed_cells: impl IntoIterator<Item = u64>) -> Self {
            FakeAccessController {
                level,
                is_allow_list,
                listed_cells: listed_cells.into_iter().collect(),
            }
        }
    }

    impl AccessController for FakeAccessController {
        fn level(&self) -> u8 {
            self.level
        }

        fn is_allowed(&self, token: LocationToken) -> bool {
            let found = self.listed_cells.contains(&token.cell_id());
            self.is_allow_list == found
        }
    }
}
