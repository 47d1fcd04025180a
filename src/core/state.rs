use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPhase {
    Idle,
    Active,
    Closing,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub state: RelayPhase,
    pub session: Option<u64>,
    pub active_for_secs: Option<u64>,
    pub sessions_served: u64,
}
