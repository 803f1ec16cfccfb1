use qsim_core::{ID, SimTime, Unique};

/// Marker type tagging [`ID`] values that identify a [`Client`].
#[derive(Debug)]
pub struct ClientMark;
pub type ClientId = ID<ClientMark>;

/// A client's accumulated ledger of time spent in each phase of its life.
/// `residence` is filled in only once the client reaches a Dispose; until
/// then it is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub waiting: SimTime,
    pub service: SimTime,
    pub post_processing: SimTime,
    pub residence: Option<SimTime>,
}

/// A token traversing the network. Carries identity, an optional type tag
/// used by per-type overrides and `DecideClientType` routing, its creation
/// time, and the ledger accumulated so far.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    type_name: Option<String>,
    created_at: SimTime,
    ledger: Ledger,
}

impl Client {
    pub fn new(id: ClientId, type_name: Option<String>, created_at: SimTime) -> Self {
        Self {
            id,
            type_name,
            created_at,
            ledger: Ledger::default(),
        }
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}

impl Unique<ClientMark> for Client {
    fn id(&self) -> ClientId {
        self.id
    }
}
