use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const RACKS_PER_DATA_CENTER: usize = 5;
pub const SERVERS_PER_RACK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Paused,
    Error,
}

impl ContainerStatus {
    pub const ALL: [ContainerStatus; 4] = [
        ContainerStatus::Running,
        ContainerStatus::Stopped,
        ContainerStatus::Paused,
        ContainerStatus::Error,
    ];
    pub const NOT_RUNNING: [ContainerStatus; 3] =
        [ContainerStatus::Stopped, ContainerStatus::Paused, ContainerStatus::Error];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Warning,
    Error,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub cpu: f64,
    pub memory: f64,
    pub ports: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    pub position: usize,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub network: f64,
    pub temperature: f64,
    pub status: ServerStatus,
    pub errors: Vec<String>,
    pub containers: Vec<Container>,
}

impl Server {
    /// Error status or any reported error line.
    pub fn has_errors(&self) -> bool {
        self.status == ServerStatus::Error || !self.errors.is_empty()
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == container_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    pub id: String,
    pub name: String,
    pub position: usize,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCenter {
    pub id: String,
    pub name: String,
    pub location: String,
    pub racks: Vec<Rack>,
}

/// The whole simulated estate plus the instant it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    pub data_centers: Vec<DataCenter>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update_time: OffsetDateTime,
}

impl Fleet {
    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.data_centers
            .iter()
            .flat_map(|dc| dc.racks.iter())
            .flat_map(|rack| rack.servers.iter())
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.servers().flat_map(|server| server.containers.iter())
    }

    pub fn server(&self, server_id: &str) -> Option<&Server> {
        self.servers().find(|s| s.id == server_id)
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers().find(|c| c.id == container_id)
    }
}
