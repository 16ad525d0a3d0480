//! Finding accelerometer boards.
//!
//! A sweep turns a list of [`Candidate`] endpoints into [`DiscoveredBoards`],
//! keyed by the asset tag each board reported. Candidates come from the
//! simulator's board registry, from ports named by the user, or from real
//! USB enumeration (see the `usb` module). Candidates that can't be identified
//! are logged and skipped; a sweep never fails.

use std::collections::{BTreeMap, BTreeSet, btree_map};

use embedded_io::{Read, Write};
use tracing::{debug, info, warn};

use crate::{
    board::{AccelerometerBoard, MANUAL_BOARD_TYPE, SIMULATOR_MANUFACTURER},
    error::SingularError,
    identity::BoardIdentity,
    transport::{Connector, TransportConfig},
};

/// Name the simulator gives emulated accelerometer boards.
pub const BOARD_FAMILY: &str = "AccelerometerBoard";

/// A virtual board announced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorBoardInfo {
    pub url: String,
    pub type_str: String,
    pub serial_number: String,
}

/// Source of the simulator's virtual boards.
pub trait SimulatorRegistry {
    /// Every virtual board of the given family.
    fn simulator_boards(&self, family: &str) -> Vec<SimulatorBoardInfo>;
}

/// A fixed list of simulator boards, grouped by family.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    boards: Vec<(String, SimulatorBoardInfo)>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board(mut self, family: &str, board: SimulatorBoardInfo) -> Self {
        self.boards.push((family.to_owned(), board));
        self
    }
}

impl SimulatorRegistry for StaticRegistry {
    fn simulator_boards(&self, family: &str) -> Vec<SimulatorBoardInfo> {
        self.boards
            .iter()
            .filter(|(board_family, _)| board_family == family)
            .map(|(_, board)| board.clone())
            .collect()
    }
}

/// An endpoint that might have an accelerometer board behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub endpoint: String,
    /// What was known about the board before contacting it.
    pub identity: Option<BoardIdentity>,
}

impl Candidate {
    pub fn new(endpoint: impl Into<String>, identity: Option<BoardIdentity>) -> Self {
        Self {
            endpoint: endpoint.into(),
            identity,
        }
    }

    /// A board announced by the simulator.
    pub fn simulated(board: SimulatorBoardInfo) -> Self {
        let identity = BoardIdentity {
            manufacturer: SIMULATOR_MANUFACTURER.to_owned(),
            board_type: board.type_str,
            asset_tag: board.serial_number,
            ..Default::default()
        };
        Self::new(board.url, Some(identity))
    }

    /// A port the user asked us to try.
    pub fn manual(endpoint: impl Into<String>) -> Self {
        let identity = BoardIdentity {
            board_type: MANUAL_BOARD_TYPE.to_owned(),
            ..Default::default()
        };
        Self::new(endpoint, Some(identity))
    }
}

/// Runs discovery sweeps.
pub struct Discovery<C: Connector, R: SimulatorRegistry, const L: usize = 128> {
    connector: C,
    registry: R,
    config: TransportConfig,
    family: String,
}

impl<C: Connector, R: SimulatorRegistry, const L: usize> Discovery<C, R, L> {
    pub fn new(connector: C, registry: R) -> Self {
        Self {
            connector,
            registry,
            config: TransportConfig::default(),
            family: BOARD_FAMILY.to_owned(),
        }
    }

    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the simulator board family searched for.
    pub fn with_family(mut self, family: &str) -> Self {
        self.family = family.to_owned();
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Find every simulator board of our family, then try each of
    /// `manual_endpoints`.
    ///
    /// Each sweep opens its ports afresh. Drop the boards of an earlier sweep
    /// before sweeping again, or two handles will address the same port.
    pub fn discover(&mut self, manual_endpoints: &[&str]) -> DiscoveredBoards<C::Port, L> {
        let mut candidates: Vec<Candidate> = self
            .registry
            .simulator_boards(&self.family)
            .into_iter()
            .map(Candidate::simulated)
            .collect();
        candidates.extend(manual_endpoints.iter().copied().map(Candidate::manual));
        self.discover_candidates(candidates)
    }

    /// Validate each candidate in order and collect the boards that identify
    /// as accelerometers.
    ///
    /// Each endpoint is opened at most once; later repeats are skipped. If two
    /// boards report the same asset tag the first one found is kept.
    pub fn discover_candidates(
        &mut self,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> DiscoveredBoards<C::Port, L> {
        let mut boards = BTreeMap::new();
        let mut tried: BTreeSet<String> = BTreeSet::new();
        for candidate in candidates {
            // A second handle on the same port would reset the board the
            // first one controls when it is dropped.
            if !tried.insert(candidate.endpoint.clone()) {
                warn!(
                    "Port {:?} was already tried in this sweep. Ignoring the repeat",
                    candidate.endpoint
                );
                continue;
            }
            debug!("Trying candidate {:?}", candidate);
            let Some(board) = AccelerometerBoard::<C::Port, L>::get_valid_board(
                &mut self.connector,
                &candidate.endpoint,
                candidate.identity,
                &self.config,
            ) else {
                continue;
            };

            match boards.entry(board.identity().asset_tag.clone()) {
                btree_map::Entry::Vacant(slot) => {
                    info!("Found accelerometer board {}", board);
                    slot.insert(board);
                }
                btree_map::Entry::Occupied(existing) => {
                    warn!(
                        "Board at port {:?} reports asset tag {:?}, already used by the board at port {:?}. Ignoring this device",
                        board.endpoint(),
                        existing.key(),
                        existing.get().endpoint()
                    );
                }
            }
        }
        DiscoveredBoards { boards }
    }
}

/// The boards found by one sweep, keyed by asset tag.
///
/// The set of boards is fixed once the sweep is done. Individual boards can
/// still be commanded through [`Self::get_mut`].
pub struct DiscoveredBoards<P: Read + Write, const L: usize = 128> {
    boards: BTreeMap<String, AccelerometerBoard<P, L>>,
}

impl<P: Read + Write, const L: usize> DiscoveredBoards<P, L> {
    pub fn get(&self, asset_tag: &str) -> Option<&AccelerometerBoard<P, L>> {
        self.boards.get(asset_tag)
    }

    pub fn get_mut(&mut self, asset_tag: &str) -> Option<&mut AccelerometerBoard<P, L>> {
        self.boards.get_mut(asset_tag)
    }

    pub fn contains(&self, asset_tag: &str) -> bool {
        self.boards.contains_key(asset_tag)
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn asset_tags(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccelerometerBoard<P, L>)> {
        self.boards.iter().map(|(tag, board)| (tag.as_str(), board))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut AccelerometerBoard<P, L>)> {
        self.boards.iter_mut().map(|(tag, board)| (tag.as_str(), board))
    }

    /// The only board found.
    pub fn singular(&self) -> Result<&AccelerometerBoard<P, L>, SingularError> {
        match self.boards.len() {
            1 => self.boards.values().next().ok_or(SingularError::NoBoards),
            0 => Err(SingularError::NoBoards),
            n => Err(SingularError::MultipleBoards(n)),
        }
    }

    /// The only board found, for sending it commands.
    pub fn singular_mut(&mut self) -> Result<&mut AccelerometerBoard<P, L>, SingularError> {
        match self.boards.len() {
            1 => self.boards.values_mut().next().ok_or(SingularError::NoBoards),
            0 => Err(SingularError::NoBoards),
            n => Err(SingularError::MultipleBoards(n)),
        }
    }
}

impl<P: Read + Write, const L: usize> IntoIterator for DiscoveredBoards<P, L> {
    type Item = (String, AccelerometerBoard<P, L>);
    type IntoIter = btree_map::IntoIter<String, AccelerometerBoard<P, L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.boards.into_iter()
    }
}
