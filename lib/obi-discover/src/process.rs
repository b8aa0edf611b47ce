use std::{collections::HashMap, path::Path};

/// An observed operating system process.
///
/// Instances are produced by the discovery layer, which is also responsible for filling in any container or
/// orchestration metadata.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProcessInfo {
    pid: u32,
    ppid: u32,
    exe_path: String,
    open_ports: Vec<u16>,
    container_id: Option<String>,
    k8s_namespace: Option<String>,
    metadata: HashMap<String, String>,
    pod_labels: HashMap<String, String>,
    pod_annotations: HashMap<String, String>,
}

impl ProcessInfo {
    /// Creates a new `ProcessInfo` for the given PID and executable path.
    pub fn new<P: Into<String>>(pid: u32, exe_path: P) -> Self {
        Self {
            pid,
            exe_path: exe_path.into(),
            ..Default::default()
        }
    }

    /// Sets the parent PID.
    pub fn with_ppid(mut self, ppid: u32) -> Self {
        self.ppid = ppid;
        self
    }

    /// Sets the ports the process is listening on.
    pub fn with_open_ports<I: IntoIterator<Item = u16>>(mut self, ports: I) -> Self {
        self.open_ports = ports.into_iter().collect();
        self
    }

    /// Sets the ID of the container the process runs in.
    pub fn with_container_id<S: Into<String>>(mut self, container_id: S) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Sets the Kubernetes namespace of the pod the process runs in.
    pub fn with_k8s_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.k8s_namespace = Some(namespace.into());
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a pod label.
    pub fn with_pod_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.pod_labels.insert(key.into(), value.into());
        self
    }

    /// Adds a pod annotation.
    pub fn with_pod_annotation<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.pod_annotations.insert(key.into(), value.into());
        self
    }

    /// Returns the PID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns the parent PID, or zero if unknown.
    pub fn ppid(&self) -> u32 {
        self.ppid
    }

    /// Returns the full executable path.
    pub fn exe_path(&self) -> &str {
        &self.exe_path
    }

    /// Returns the last component of the executable path.
    pub fn exe_basename(&self) -> &str {
        Path::new(&self.exe_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Returns the ports the process is listening on.
    pub fn open_ports(&self) -> &[u16] {
        &self.open_ports
    }

    /// Returns the container ID, if the process runs in a container.
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// Returns the Kubernetes namespace, if known.
    pub fn k8s_namespace(&self) -> Option<&str> {
        self.k8s_namespace.as_deref()
    }

    /// Returns the metadata value for the given key.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns the pod label value for the given key.
    pub fn pod_label(&self, key: &str) -> Option<&str> {
        self.pod_labels.get(key).map(String::as_str)
    }

    /// Returns the pod annotation value for the given key.
    pub fn pod_annotation(&self, key: &str) -> Option<&str> {
        self.pod_annotations.get(key).map(String::as_str)
    }
}
