//! End-to-end pairing between in-process clusters.
//!
//! Every cluster gets its own [`MemKvdb`]; a loopback dialer routes
//! `ip:port` to the target [`ClusterManager`] without touching the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use libkvdb::{Kvdb, MemKvdb};
use libpair::store::pair_key;
use libpair::*;

#[derive(Default)]
struct Network {
    clusters: RwLock<HashMap<String, Arc<ClusterManager>>>,
}

impl Network {
    fn attach(&self, ip: &str, port: u16, manager: Arc<ClusterManager>) {
        self.clusters
            .write()
            .unwrap()
            .insert(format!("{ip}:{port}"), manager);
    }
}

struct Loopback(Arc<ClusterManager>);

#[async_trait]
impl RemoteCluster for Loopback {
    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError> {
        ClusterPairing::process_pair_request(self.0.as_ref(), request).await
    }
}

struct LoopbackDialer(Arc<Network>);

#[async_trait]
impl RemoteDialer for LoopbackDialer {
    async fn dial(&self, ip: &str, port: u16) -> Result<Box<dyn RemoteCluster>, PairError> {
        let manager = self
            .0
            .clusters
            .read()
            .unwrap()
            .get(&format!("{ip}:{port}"))
            .cloned()
            .ok_or_else(|| PairError::RemoteUnreachable(format!("connection refused {ip}:{port}")))?;
        Ok(Box::new(Loopback(manager)))
    }
}

type Journal = Arc<Mutex<Vec<String>>>;

/// Appends "<name>:<event>" to a shared journal and optionally fails or
/// contributes an option.
struct Recorder {
    name: String,
    journal: Journal,
    fail_create: bool,
    fail_process: bool,
    option: Option<(String, String)>,
}

impl Recorder {
    fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: Arc::clone(journal),
            fail_create: false,
            fail_process: false,
            option: None,
        }
    }

    fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    fn failing_process(mut self) -> Self {
        self.fail_process = true;
        self
    }

    fn with_option(mut self, key: &str, value: &str) -> Self {
        self.option = Some((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl ClusterListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_pair(
        &self,
        _self_node: &NodeInfo,
        response: &ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:create:{}", self.name, response.remote_cluster_id));
        if self.fail_create {
            return Err(PairError::Internal("refused".into()));
        }
        Ok(())
    }

    async fn process_pair_request(
        &self,
        _self_node: &NodeInfo,
        response: &mut ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:process", self.name));
        if self.fail_process {
            return Err(PairError::Internal("refused".into()));
        }
        if let Some((k, v)) = &self.option {
            response.options.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

struct Cluster {
    kv: Arc<MemKvdb>,
    manager: Arc<ClusterManager>,
    ip: String,
    port: u16,
}

impl Cluster {
    async fn token(&self) -> String {
        self.manager.get_pair_token(false).await.unwrap().token
    }

    fn request_to(&self, token: String, set_default: bool) -> ClusterPairCreateRequest {
        ClusterPairCreateRequest {
            remote_cluster_ip: self.ip.clone(),
            remote_cluster_port: self.port,
            remote_cluster_token: token,
            set_default,
        }
    }
}

fn spawn_cluster(
    network: &Arc<Network>,
    id: &str,
    ip: &str,
    listeners: Vec<Arc<dyn ClusterListener>>,
) -> Cluster {
    let kv = Arc::new(MemKvdb::new());
    let config = ClusterConfig::new(id, format!("{id}-node-1"))
        .with_name(format!("{id}-name"))
        .with_mgmt_ip(ip);
    let mut builder = ClusterManager::builder(
        config,
        kv.clone(),
        Arc::new(LoopbackDialer(Arc::clone(network))),
    );
    for listener in listeners {
        builder = builder.listener(listener);
    }
    let manager = Arc::new(builder.build().unwrap());
    let port = 9001;
    network.attach(ip, port, Arc::clone(&manager));
    Cluster {
        kv,
        manager,
        ip: ip.into(),
        port,
    }
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[tokio::test]
async fn pair_two_clusters() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);

    let token = b.token().await;
    let resp = a
        .manager
        .create_pair(b.request_to(token.clone(), false))
        .await
        .unwrap();
    assert_eq!(resp.remote_cluster_id, "B");
    assert_eq!(resp.remote_cluster_name, "B-name");

    let got = a.manager.get_pair("B").await.unwrap().pair_info;
    assert_eq!(got.id, "B");
    assert_eq!(got.name, "B-name");
    assert_eq!(got.ip, "10.0.0.2");
    assert_eq!(got.port, 9001);
    assert_eq!(got.token, token);

    // The first pair of a cluster is its default.
    let default = a.manager.get_pair("").await.unwrap().pair_info;
    assert_eq!(default, got);

    // The acceptor keeps no reciprocal record.
    assert!(b.manager.enumerate_pairs().await.unwrap().pairs.is_empty());
    assert_eq!(a.kv.held_locks().await, 0);
    assert_eq!(b.kv.held_locks().await, 0);
}

#[tokio::test]
async fn default_follows_set_default() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    let c = spawn_cluster(&network, "C", "10.0.0.3", vec![]);

    a.manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap();
    a.manager
        .create_pair(c.request_to(c.token().await, false))
        .await
        .unwrap();
    assert_eq!(a.manager.enumerate_pairs().await.unwrap().default_id, "B");

    let d = spawn_cluster(&network, "D", "10.0.0.4", vec![]);
    a.manager
        .create_pair(d.request_to(d.token().await, true))
        .await
        .unwrap();

    let listing = a.manager.enumerate_pairs().await.unwrap();
    assert_eq!(listing.default_id, "D");
    let mut ids: Vec<_> = listing.pairs.keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, ["B", "C", "D"]);
    assert!(!listing.pairs.contains_key("default"));
}

#[tokio::test]
async fn deleting_default_clears_pointer() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    let c = spawn_cluster(&network, "C", "10.0.0.3", vec![]);

    a.manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap();
    a.manager
        .create_pair(c.request_to(c.token().await, false))
        .await
        .unwrap();

    // Deleting a non-default pair leaves the pointer alone.
    a.manager.delete_pair("C").await.unwrap();
    assert_eq!(a.manager.enumerate_pairs().await.unwrap().default_id, "B");

    a.manager.delete_pair("B").await.unwrap();
    let err = a.manager.get_pair("").await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    let listing = a.manager.enumerate_pairs().await.unwrap();
    assert_eq!(listing.default_id, "");
    assert!(listing.pairs.is_empty());
    assert!(a.kv.get(DEFAULT_PAIR_KEY).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn wrong_token_is_rejected_without_state() {
    let network = Arc::new(Network::default());
    let a_journal = journal();
    let b_journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![Arc::new(Recorder::new("a1", &a_journal))],
    );
    let b = spawn_cluster(
        &network,
        "B",
        "10.0.0.2",
        vec![Arc::new(Recorder::new("b1", &b_journal))],
    );

    let real = b.token().await;
    let err = a
        .manager
        .create_pair(b.request_to(format!("{real}00"), false))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::AuthenticationFailed(_)), "{err}");

    assert!(a.kv.get(&pair_key("B")).await.unwrap_err().is_not_found());
    assert!(a.manager.enumerate_pairs().await.unwrap().pairs.is_empty());
    assert!(entries(&a_journal).is_empty());
    assert!(entries(&b_journal).is_empty());
    assert_eq!(a.kv.held_locks().await, 0);
    assert_eq!(b.kv.held_locks().await, 0);
}

#[tokio::test]
async fn reset_token_invalidates_old_one() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);

    let old = b.token().await;
    let new = b.manager.get_pair_token(true).await.unwrap().token;
    assert_ne!(old, new);
    assert_eq!(b.token().await, new);

    let err = a
        .manager
        .create_pair(b.request_to(old, false))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::AuthenticationFailed(_)));

    a.manager
        .create_pair(b.request_to(new, false))
        .await
        .unwrap();
}

#[tokio::test]
async fn unreachable_remote_leaves_no_state() {
    let network = Arc::new(Network::default());
    let journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![Arc::new(Recorder::new("a1", &journal))],
    );

    let err = a
        .manager
        .create_pair(ClusterPairCreateRequest {
            remote_cluster_ip: "10.9.9.9".into(),
            remote_cluster_port: 9001,
            remote_cluster_token: "x".into(),
            set_default: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::RemoteUnreachable(_)), "{err}");
    assert!(a.kv.is_empty().await);
    assert!(entries(&journal).is_empty());
}

#[tokio::test]
async fn create_listeners_stop_at_first_failure() {
    let network = Arc::new(Network::default());
    let journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![
            Arc::new(Recorder::new("l1", &journal)),
            Arc::new(Recorder::new("l2", &journal).failing_create()),
            Arc::new(Recorder::new("l3", &journal)),
        ],
    );
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);

    let err = a
        .manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap_err();
    match err {
        PairError::ListenerRejected { listener, .. } => assert_eq!(listener, "l2"),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(entries(&journal), ["l1:create:B", "l2:create:B"]);
    assert!(a.manager.get_pair("B").await.unwrap_err().is_not_found());
    assert_eq!(a.kv.held_locks().await, 0);
}

#[tokio::test]
async fn acceptor_listeners_enrich_options() {
    let network = Arc::new(Network::default());
    let b_journal = journal();
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(
        &network,
        "B",
        "10.0.0.2",
        vec![
            Arc::new(Recorder::new("objectstore", &b_journal).with_option("bucket", "b-1")),
            Arc::new(Recorder::new("scheduler", &b_journal).with_option("region", "east")),
        ],
    );

    a.manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap();

    let stored = a.manager.get_pair("B").await.unwrap().pair_info;
    assert_eq!(stored.options.get("bucket").map(String::as_str), Some("b-1"));
    assert_eq!(stored.options.get("region").map(String::as_str), Some("east"));
    assert_eq!(
        entries(&b_journal),
        ["objectstore:process", "scheduler:process"]
    );
}

#[tokio::test]
async fn acceptor_listener_failure_reaches_initiator() {
    let network = Arc::new(Network::default());
    let a_journal = journal();
    let b_journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![Arc::new(Recorder::new("a1", &a_journal))],
    );
    let b = spawn_cluster(
        &network,
        "B",
        "10.0.0.2",
        vec![
            Arc::new(Recorder::new("b1", &b_journal).failing_process()),
            Arc::new(Recorder::new("b2", &b_journal)),
        ],
    );

    let err = a
        .manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::ListenerRejected { .. }), "{err}");
    assert_eq!(entries(&b_journal), ["b1:process"]);
    assert!(entries(&a_journal).is_empty());
    assert!(a.manager.enumerate_pairs().await.unwrap().pairs.is_empty());
}

#[tokio::test]
async fn duplicate_pair_notifies_then_fails() {
    let network = Arc::new(Network::default());
    let journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![Arc::new(Recorder::new("a1", &journal))],
    );
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    let token = b.token().await;

    a.manager
        .create_pair(b.request_to(token.clone(), false))
        .await
        .unwrap();
    let err = a
        .manager
        .create_pair(b.request_to(token, true))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::AlreadyExists(_)), "{err}");
    assert_eq!(entries(&journal), ["a1:create:B", "a1:create:B"]);
    assert_eq!(a.manager.enumerate_pairs().await.unwrap().pairs.len(), 1);
    assert_eq!(a.kv.held_locks().await, 0);
}

#[tokio::test]
async fn lock_failure_after_listeners_writes_nothing() {
    let network = Arc::new(Network::default());
    let journal = journal();
    let a = spawn_cluster(
        &network,
        "A",
        "10.0.0.1",
        vec![Arc::new(Recorder::new("a1", &journal))],
    );
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    let token = b.token().await;

    a.kv.fail_lock(true);
    let err = a
        .manager
        .create_pair(b.request_to(token, false))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::StoreUnavailable(_)), "{err}");
    // Listeners already observed the pair; the record was never written.
    assert_eq!(entries(&journal), ["a1:create:B"]);
    assert_eq!(a.kv.held_locks().await, 0);

    a.kv.fail_lock(false);
    assert!(a.manager.enumerate_pairs().await.unwrap().pairs.is_empty());
    assert!(a.kv.get(&pair_key("B")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn acceptor_store_outage_fails_handshake() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    let token = b.token().await;

    b.kv.set_unavailable(true);
    let err = a
        .manager
        .create_pair(b.request_to(token, false))
        .await
        .unwrap_err();
    assert!(matches!(err, PairError::StoreUnavailable(_)), "{err}");
    assert!(a.manager.enumerate_pairs().await.unwrap().pairs.is_empty());
}

#[tokio::test]
async fn update_replaces_record() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);

    a.manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap();

    let mut info = a.manager.get_pair("B").await.unwrap().pair_info;
    info.ip = "10.0.1.2".into();
    info.port = 9100;
    a.manager.update_pair(info.clone()).await.unwrap();
    assert_eq!(a.manager.get_pair("B").await.unwrap().pair_info, info);
    assert_eq!(a.manager.enumerate_pairs().await.unwrap().default_id, "B");

    let missing = ClusterPairInfo {
        id: "Z".into(),
        ..Default::default()
    };
    assert!(a.manager.update_pair(missing).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn lookups_of_unknown_pairs() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);

    assert!(a.manager.get_pair("").await.unwrap_err().is_not_found());
    assert!(a.manager.get_pair("nope").await.unwrap_err().is_not_found());
    assert!(a.manager.delete_pair("nope").await.unwrap_err().is_not_found());
    assert!(matches!(
        a.manager.get_pair("default").await.unwrap_err(),
        PairError::InvalidArgument(_)
    ));

    let listing = a.manager.enumerate_pairs().await.unwrap();
    assert_eq!(listing.default_id, "");
    assert!(listing.pairs.is_empty());
    assert_eq!(a.kv.held_locks().await, 0);
}

#[tokio::test]
async fn unreadable_default_fails_enumeration() {
    let network = Arc::new(Network::default());
    let a = spawn_cluster(&network, "A", "10.0.0.1", vec![]);
    let b = spawn_cluster(&network, "B", "10.0.0.2", vec![]);
    a.manager
        .create_pair(b.request_to(b.token().await, false))
        .await
        .unwrap();

    a.kv.fail_get(DEFAULT_PAIR_KEY, true);
    let err = a.manager.enumerate_pairs().await.unwrap_err();
    assert!(matches!(err, PairError::StoreUnavailable(_)), "{err}");
    // Records stay readable; only the listing as a whole is refused.
    assert_eq!(a.manager.get_pair("B").await.unwrap().pair_info.id, "B");

    a.kv.fail_get(DEFAULT_PAIR_KEY, false);
    let listing = a.manager.enumerate_pairs().await.unwrap();
    assert_eq!(listing.default_id, "B");
    assert_eq!(listing.pairs.len(), 1);
}
