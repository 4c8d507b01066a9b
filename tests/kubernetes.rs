use agent_identity::{
    Configuration, Environment, Error, KubernetesReader, MetadataServerClient, MonitoredResource,
    OAuth2, QueryContext, ResourceMetadata,
};
use httptest::{matchers::*, responders::*, Expectation, Server};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

fn environment(server: &Server) -> Arc<Environment> {
    Arc::new(Environment::with_metadata_server(
        Configuration::new()
            .with_project_id("my-project")
            .with_instance_zone("us-central1-a")
            .with_kubernetes_cluster_name("my-cluster")
            .with_kubernetes_cluster_location("us-central1"),
        MetadataServerClient::new(Some(server.url_str("/"))),
    ))
}

fn node(name: &str) -> ResourceMetadata {
    ResourceMetadata {
        ids: vec![format!("k8s_node.{}", name)],
        resource: MonitoredResource::new("k8s_node", [("node_name", name)]),
        metadata: serde_json::json!({ "kind": "Node", "metadata": { "name": name } }),
        collected_at: SystemTime::now(),
    }
}

#[test]
fn query_is_authenticated() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/instance/service-accounts/default/token",
        ))
        .respond_with(status_code(200).body(
            r#"{"access_token": "the-access-token", "token_type": "Bearer", "expires_in": 3600}"#,
        )),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let source = {
        let seen = seen.clone();
        move |ctx: &QueryContext| -> Result<Vec<ResourceMetadata>, Error> {
            seen.lock().unwrap().push(ctx.clone());
            Ok(vec![node("node-1"), node("node-2")])
        }
    };

    let reader = KubernetesReader::new(environment(&server), source);

    let resources = reader.metadata_query().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].ids, vec!["k8s_node.node-1".to_owned()]);

    // The second cycle reuses the cached token
    reader.metadata_query().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0],
        QueryContext {
            auth_header: "Bearer the-access-token".to_owned(),
            project_id: "my-project".to_owned(),
            cluster_name: "my-cluster".to_owned(),
            cluster_location: "us-central1".to_owned(),
            instance_zone: "us-central1-a".to_owned(),
        }
    );
}

#[test]
fn no_query_without_authorization() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/instance/service-accounts/default/token",
        ))
        .respond_with(status_code(403)),
    );

    let source = |_: &QueryContext| -> Result<Vec<ResourceMetadata>, Error> {
        panic!("queried without a token")
    };

    let auth = OAuth2::new(environment(&server));
    let reader = KubernetesReader::with_auth(auth, source);

    assert!(matches!(
        reader.metadata_query(),
        Err(Error::HttpStatus(_))
    ));
}
