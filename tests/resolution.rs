//! End-to-end resolution tests.
//!
//! These tests drive the resolver against in-memory HAL fixtures and check
//! identity, cycle handling, fetch accounting and error propagation.

use std::sync::Arc;

use hal_graph::{
    BindingError, ContainerKind, FetchError, GraphResolver, InMemoryTransport, RelatedCollection,
    ResolveError, ResolverConfig, ResourceLocator, ResourceSchema, SchemaRegistry, Session, Shared,
    COMMON_CACHE, INTERMEDIATE_CACHE,
};
use serde::Deserialize;
use serde_json::{json, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct Parent {
    name: String,
    #[serde(skip)]
    children: RelatedCollection<Child>,
}

#[derive(Debug, Default, Deserialize)]
struct Child {
    name: String,
    #[serde(skip)]
    parent: Option<Shared<Parent>>,
    #[serde(skip)]
    school: Option<Shared<Person>>,
}

#[derive(Debug, Default, Deserialize)]
struct Person {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Article {
    title: String,
    #[serde(skip)]
    author: Option<Shared<Person>>,
    #[serde(skip)]
    reviewer: Option<Shared<Person>>,
}

#[derive(Debug, Default, Deserialize)]
struct Badge {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Card {
    #[serde(skip)]
    holder: Option<Shared<Person>>,
    #[serde(skip)]
    badge: Option<Shared<Badge>>,
}

#[derive(Debug, Default, Deserialize)]
struct Gallery {
    #[serde(skip)]
    cover: Option<Shared<Person>>,
}

fn loc(s: &str) -> ResourceLocator {
    ResourceLocator::parse(s).unwrap()
}

fn hal(name: &str, self_href: &str, links: Value) -> Value {
    let mut links = links.as_object().cloned().unwrap_or_default();
    links.insert("self".into(), json!({ "href": self_href }));
    json!({ "name": name, "_links": links })
}

fn family_schemas(parent_kind: ContainerKind) -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            ResourceSchema::<Parent>::new("Parent")
                .cache("parents", 10)
                .collection("children", parent_kind, |p: &mut Parent, c| p.children = c)
                .rel("children"),
        )
        .with(
            ResourceSchema::<Child>::new("Child")
                .cache("children", 10)
                .single("parent", |c: &mut Child, p| c.parent = Some(p))
                .rel("parent"),
        )
}

fn cyclic_transport() -> InMemoryTransport {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/children/1"),
        hal("c1", "http://h/children/1", json!({ "parent": { "href": "/parents/1" } })),
    );
    transport.add_resource(
        loc("http://h/parents/1"),
        hal(
            "p1",
            "http://h/parents/1",
            json!({ "children": [{ "href": "/children/1" }] }),
        ),
    );
    transport
}

fn resolver_with(
    transport: InMemoryTransport,
    schemas: SchemaRegistry,
    config: ResolverConfig,
) -> GraphResolver<InMemoryTransport> {
    GraphResolver::new(Arc::new(transport), Arc::new(schemas), config)
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycles and identity
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_child_parent_cycle_populates_back_reference() {
    let resolver = resolver_with(
        cyclic_transport(),
        family_schemas(ContainerKind::List),
        ResolverConfig::default(),
    );

    let c1 = resolver.resolve::<Child>(&loc("http://h/children/1")).await.unwrap();
    let p = c1.read().parent.clone().expect("parent populated");

    assert_eq!(p.read().name, "p1");
    let children = p.read().children.clone();
    assert_eq!(children.len(), 1);
    assert!(Arc::ptr_eq(&children.get(0).unwrap(), &c1));
    assert_eq!(resolver.fetch_count(), 2);
}

#[tokio::test]
async fn test_cycle_resolved_from_parent_side() {
    let resolver = resolver_with(
        cyclic_transport(),
        family_schemas(ContainerKind::List),
        ResolverConfig::default(),
    );

    let p = resolver.resolve::<Parent>(&loc("http://h/parents/1")).await.unwrap();
    let c1 = p.read().children.get(0).unwrap();
    assert!(Arc::ptr_eq(&c1.read().parent.clone().unwrap(), &p));
}

#[tokio::test]
async fn test_cycle_terminates_with_caching_disabled() {
    let config = ResolverConfig {
        caching_disabled: true,
        ..Default::default()
    };
    let resolver = resolver_with(cyclic_transport(), family_schemas(ContainerKind::List), config);

    let c1 = resolver.resolve::<Child>(&loc("http://h/children/1")).await.unwrap();
    let p = c1.read().parent.clone().unwrap();
    assert!(Arc::ptr_eq(&p.read().children.get(0).unwrap(), &c1));
    assert_eq!(resolver.caches().count_for("children"), 0);
}

#[tokio::test]
async fn test_self_reference_is_deferred() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/children/9"),
        hal("loop", "http://h/children/9", json!({ "sibling": { "href": "/children/9" } })),
    );
    let schemas = SchemaRegistry::new().with(
        ResourceSchema::<Child>::new("Child")
            .cache("children", 10)
            .collection("siblings", ContainerKind::Set, |_c: &mut Child, _s: RelatedCollection<Child>| {})
            .rel("sibling"),
    );
    let resolver = resolver_with(transport, schemas, ResolverConfig::default());

    let child = resolver.resolve::<Child>(&loc("http://h/children/9")).await.unwrap();
    assert_eq!(child.read().name, "loop");
    assert_eq!(resolver.fetch_count(), 1);
}

#[tokio::test]
async fn test_identity_across_sequential_calls() {
    let resolver = resolver_with(
        cyclic_transport(),
        family_schemas(ContainerKind::List),
        ResolverConfig::default(),
    );

    let first = resolver.resolve::<Child>(&loc("http://h/children/1")).await.unwrap();
    let second = resolver.resolve::<Child>(&loc("http://h/children/1")).await.unwrap();
    let parent = resolver.resolve::<Parent>(&loc("http://h/parents/1")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.read().parent.clone().unwrap(), &parent));
    assert_eq!(resolver.fetch_count(), 2);

    let stats = resolver.caches().statistics();
    assert_eq!(stats.hits.get("children"), Some(&1));
    assert_eq!(stats.hits.get("parents"), Some(&1));
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch accounting
// ─────────────────────────────────────────────────────────────────────────────

fn article_transport() -> InMemoryTransport {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/articles/1"),
        json!({
            "title": "Graphs",
            "_links": {
                "self": { "href": "http://h/articles/1" },
                "author": { "href": "http://h/people/1" },
                "reviewer": { "href": "http://h/people/1" },
                "comments": { "href": "http://h/articles/1/comments" }
            }
        }),
    );
    transport.add_resource(loc("http://h/people/1"), hal("ada", "http://h/people/1", json!({})));
    transport
}

fn article_schemas(person_cached: bool) -> SchemaRegistry {
    let person = ResourceSchema::<Person>::new("Person");
    let person = if person_cached { person.cacheable() } else { person };
    SchemaRegistry::new().with(person).with(
        ResourceSchema::<Article>::new("Article")
            .cacheable()
            .single("author", |a: &mut Article, p| a.author = Some(p))
            .rel("author")
            .single("reviewer", |a: &mut Article, p| a.reviewer = Some(p))
            .rel("reviewer"),
    )
}

#[tokio::test]
async fn test_shared_target_fetched_once_per_traversal() {
    let config = ResolverConfig {
        caching_disabled: true,
        ..Default::default()
    };
    let resolver = resolver_with(article_transport(), article_schemas(true), config);

    let article = resolver.resolve::<Article>(&loc("http://h/articles/1")).await.unwrap();
    let article = article.read();
    assert_eq!(article.title, "Graphs");
    assert!(Arc::ptr_eq(
        article.author.as_ref().unwrap(),
        article.reviewer.as_ref().unwrap()
    ));
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/people/1")), 1);
}

#[tokio::test]
async fn test_unmapped_relation_skipped() {
    let resolver = resolver_with(article_transport(), article_schemas(true), ResolverConfig::default());

    resolver.resolve::<Article>(&loc("http://h/articles/1")).await.unwrap();
    assert_eq!(
        resolver.transport().fetch_count(&loc("http://h/articles/1/comments")),
        0
    );
}

#[tokio::test]
async fn test_intermediate_cache_cleared_after_resolve() {
    let resolver = resolver_with(article_transport(), article_schemas(false), ResolverConfig::default());

    resolver.resolve::<Article>(&loc("http://h/articles/1")).await.unwrap();
    assert_eq!(resolver.caches().count_for(INTERMEDIATE_CACHE), 0);

    // Undeclared types are not kept between resolves.
    resolver.resolve::<Person>(&loc("http://h/people/1")).await.unwrap();
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/people/1")), 2);
}

#[tokio::test]
async fn test_lru_eviction_forces_refetch() {
    let mut transport = InMemoryTransport::new();
    for p in 1..=5 {
        let href = format!("http://h/parents/{p}");
        transport.add_resource(loc(&href), hal(&format!("p{p}"), &href, json!({})));
    }
    for c in 1..=8 {
        let href = format!("http://h/children/{c}");
        let parent = format!("/parents/{}", (c - 1) % 5 + 1);
        transport.add_resource(
            loc(&href),
            hal(&format!("c{c}"), &href, json!({ "parent": { "href": parent } })),
        );
    }

    let schemas = SchemaRegistry::new()
        .with(ResourceSchema::<Parent>::new("Parent").cacheable())
        .with(
            ResourceSchema::<Child>::new("Child")
                .cacheable()
                .single("parent", |c: &mut Child, p| c.parent = Some(p))
                .rel("parent"),
        );
    let config = ResolverConfig {
        default_cache_capacity: 5,
        ..Default::default()
    };
    let session = Session::from_config(Arc::new(transport), Arc::new(schemas), config).unwrap();

    for c in 1..=8 {
        let child = session
            .resolve_str::<Child>(&format!("http://h/children/{c}"))
            .await
            .unwrap();
        let expected = format!("p{}", (c - 1) % 5 + 1);
        assert_eq!(child.read().parent.as_ref().unwrap().read().name, expected);
    }

    let stats = session.statistics();
    assert_eq!(stats.fetch_count, 16);
    assert_eq!(stats.total_hits(), 0);
    assert_eq!(stats.total_misses(), 16);
    assert_eq!(session.cached_count(COMMON_CACHE), 5);
}

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

fn brood_transport() -> InMemoryTransport {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/parents/1"),
        hal(
            "p1",
            "http://h/parents/1",
            json!({ "children": [
                { "href": "/children/2" },
                { "href": "/children/1" },
                { "href": "/children/3" }
            ] }),
        ),
    );
    for c in 1..=3 {
        let href = format!("http://h/children/{c}");
        transport.add_resource(
            loc(&href),
            hal(&format!("c{c}"), &href, json!({ "parent": { "href": "/parents/1" } })),
        );
    }
    transport
}

#[tokio::test]
async fn test_collection_keeps_link_order_and_identity() {
    let resolver = resolver_with(
        brood_transport(),
        family_schemas(ContainerKind::Queue),
        ResolverConfig::default(),
    );

    let parent = resolver.resolve::<Parent>(&loc("http://h/parents/1")).await.unwrap();
    let children = parent.read().children.clone();
    assert_eq!(children.kind(), ContainerKind::Queue);

    let names: Vec<String> = children.to_vec().iter().map(|c| c.read().name.clone()).collect();
    assert_eq!(names, vec!["c2", "c1", "c3"]);
    for child in children.to_vec() {
        assert!(Arc::ptr_eq(child.read().parent.as_ref().unwrap(), &parent));
    }
    assert_eq!(resolver.fetch_count(), 4);
}

#[tokio::test]
async fn test_collection_endpoint() {
    let mut transport = InMemoryTransport::new();
    transport.add_collection(
        loc("http://h/parents"),
        json!({
            "_embedded": {
                "parents": [
                    hal("p1", "/parents/1", json!({ "children": [{ "href": "/children/1" }] }))
                ]
            }
        }),
    );
    transport.add_resource(
        loc("http://h/children/1"),
        hal("c1", "http://h/children/1", json!({ "parent": { "href": "/parents/1" } })),
    );
    let resolver = resolver_with(transport, family_schemas(ContainerKind::List), ResolverConfig::default());

    let parents = resolver
        .resolve_collection::<Parent>(&loc("http://h/parents"))
        .await
        .unwrap();
    assert_eq!(parents.len(), 1);

    let p1 = &parents[0];
    let c1 = p1.read().children.get(0).unwrap();
    assert!(Arc::ptr_eq(c1.read().parent.as_ref().unwrap(), p1));
    assert_eq!(resolver.fetch_count(), 2);
    assert_eq!(resolver.caches().count_for("parents"), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_array_relation_rejected_before_any_fetch() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/galleries/1"),
        json!({
            "_links": {
                "self": { "href": "http://h/galleries/1" },
                "cover": { "href": "http://h/people/1" },
                "images": [{ "href": "http://h/people/2" }]
            }
        }),
    );
    transport.add_resource(loc("http://h/people/1"), hal("ada", "http://h/people/1", json!({})));

    let schemas = SchemaRegistry::new()
        .with(ResourceSchema::<Person>::new("Person").cacheable())
        .with(
            ResourceSchema::<Gallery>::new("Gallery")
                .cacheable()
                .single("cover", |g: &mut Gallery, p| g.cover = Some(p))
                .rel("cover")
                .array::<Person>("images")
                .rel("images"),
        );
    let resolver = resolver_with(transport, schemas, ResolverConfig::default());

    let err = resolver
        .resolve::<Gallery>(&loc("http://h/galleries/1"))
        .await
        .unwrap_err();
    match err {
        ResolveError::UnsupportedRelation { owner, relation } => {
            assert_eq!(owner, "Gallery");
            assert_eq!(relation, "images");
        }
        other => panic!("expected unsupported relation, got {other:?}"),
    }
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/people/1")), 0);
    assert_eq!(resolver.caches().count_for(COMMON_CACHE), 0);
}

#[tokio::test]
async fn test_fetch_failure_aborts_but_keeps_completed_resources() {
    let mut transport = article_transport();
    transport.fail(
        loc("http://h/people/1"),
        FetchError::Status {
            status: 503,
            body: "busy".into(),
        },
    );
    // Healthy author first, failing reviewer second.
    transport.add_resource(
        loc("http://h/articles/2"),
        json!({
            "title": "Caches",
            "_links": {
                "self": { "href": "http://h/articles/2" },
                "author": { "href": "http://h/people/2" },
                "reviewer": { "href": "http://h/people/1" }
            }
        }),
    );
    transport.add_resource(loc("http://h/people/2"), hal("grace", "http://h/people/2", json!({})));
    let resolver = resolver_with(transport, article_schemas(true), ResolverConfig::default());

    let err = resolver
        .resolve::<Article>(&loc("http://h/articles/2"))
        .await
        .unwrap_err();
    match err {
        ResolveError::Fetch { locator, source } => {
            assert_eq!(locator, loc("http://h/people/1"));
            assert!(matches!(source, FetchError::Status { status: 503, .. }));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }

    // The author completed before the failure and stays cached; the article does not.
    assert_eq!(resolver.caches().count_for(COMMON_CACHE), 1);
    let author = resolver.resolve::<Person>(&loc("http://h/people/2")).await.unwrap();
    assert_eq!(author.read().name, "grace");
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/people/2")), 1);
}

#[tokio::test]
async fn test_failed_resolve_evicts_owner_awaiting_back_reference() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/children/1"),
        json!({
            "name": "c1",
            "_links": {
                "self": { "href": "http://h/children/1" },
                "parent": { "href": "/parents/1" },
                "school": { "href": "/schools/1" }
            }
        }),
    );
    transport.add_resource(
        loc("http://h/parents/1"),
        hal("p1", "http://h/parents/1", json!({ "children": [{ "href": "/children/1" }] })),
    );
    transport.fail(
        loc("http://h/schools/1"),
        FetchError::Transport("connection reset".into()),
    );

    let schemas = SchemaRegistry::new()
        .with(
            ResourceSchema::<Parent>::new("Parent")
                .cache("parents", 10)
                .collection("children", ContainerKind::List, |p: &mut Parent, c| p.children = c)
                .rel("children"),
        )
        .with(
            ResourceSchema::<Child>::new("Child")
                .cache("children", 10)
                .single("parent", |c: &mut Child, p| c.parent = Some(p))
                .rel("parent")
                .single("school", |c: &mut Child, s| c.school = Some(s))
                .rel("school"),
        )
        .with(ResourceSchema::<Person>::new("Person").cacheable());
    let resolver = resolver_with(transport, schemas, ResolverConfig::default());

    let err = resolver
        .resolve::<Child>(&loc("http://h/children/1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Fetch { ref locator, .. } if *locator == loc("http://h/schools/1")
    ));

    // p1 completed, but its children collection still waited on c1.
    assert_eq!(resolver.caches().count_for("parents"), 0);
    assert_eq!(resolver.caches().count_for("children"), 0);

    // A later resolve fetches p1 again instead of serving the half-linked copy.
    let _ = resolver.resolve::<Parent>(&loc("http://h/parents/1")).await;
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/parents/1")), 2);
}

#[tokio::test]
async fn test_one_locator_bound_as_two_types_is_binding_error() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/cards/1"),
        json!({
            "_links": {
                "self": { "href": "http://h/cards/1" },
                "holder": { "href": "/people/1" },
                "badge": { "href": "/people/1" }
            }
        }),
    );
    transport.add_resource(loc("http://h/people/1"), hal("ada", "http://h/people/1", json!({})));

    let schemas = SchemaRegistry::new()
        .with(ResourceSchema::<Person>::new("Person").cacheable())
        .with(ResourceSchema::<Badge>::new("Badge"))
        .with(
            ResourceSchema::<Card>::new("Card")
                .single("holder", |c: &mut Card, p| c.holder = Some(p))
                .rel("holder")
                .single("badge", |c: &mut Card, b| c.badge = Some(b))
                .rel("badge"),
        );
    let resolver = resolver_with(transport, schemas, ResolverConfig::default());

    let err = resolver.resolve::<Card>(&loc("http://h/cards/1")).await.unwrap_err();
    match err {
        ResolveError::Binding { owner, relation, source } => {
            assert_eq!(owner, "Card");
            assert_eq!(relation, "badge");
            assert_eq!(
                source,
                BindingError::TypeMismatch {
                    expected: std::any::type_name::<Badge>()
                }
            );
        }
        other => panic!("expected binding error, got {other:?}"),
    }
    assert_eq!(resolver.transport().fetch_count(&loc("http://h/people/1")), 1);
}

#[tokio::test]
async fn test_collection_element_without_self_link() {
    let mut transport = InMemoryTransport::new();
    transport.add_collection(
        loc("http://h/parents"),
        json!([
            hal("p1", "/parents/1", json!({})),
            { "name": "anonymous" }
        ]),
    );
    let resolver = resolver_with(transport, family_schemas(ContainerKind::List), ResolverConfig::default());

    let err = resolver
        .resolve_collection::<Parent>(&loc("http://h/parents"))
        .await
        .unwrap_err();
    match err {
        ResolveError::MissingSelfLink { locator, index } => {
            assert_eq!(locator, loc("http://h/parents"));
            assert_eq!(index, 1);
        }
        other => panic!("expected missing self link, got {other:?}"),
    }
    // Elements before the failure were complete and stay cached.
    assert_eq!(resolver.caches().count_for("parents"), 1);
}

#[tokio::test]
async fn test_decode_failure_is_fetch_error() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/people/1"),
        json!({ "name": 42, "_links": { "self": { "href": "http://h/people/1" } } }),
    );
    let resolver = resolver_with(
        transport,
        SchemaRegistry::new().with(ResourceSchema::<Person>::new("Person")),
        ResolverConfig::default(),
    );

    let err = resolver.resolve::<Person>(&loc("http://h/people/1")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Fetch {
            source: FetchError::Decode(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_locator_string() {
    let session = Session::from_config(
        Arc::new(InMemoryTransport::new()),
        Arc::new(family_schemas(ContainerKind::List)),
        ResolverConfig::default(),
    )
    .unwrap();
    let err = session.resolve_str::<Child>("children/1").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidLocator(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Convention mode
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convention_mode_matches_field_names() {
    let mut transport = InMemoryTransport::new();
    transport.add_resource(
        loc("http://h/children/1"),
        hal("c1", "http://h/children/1", json!({ "parent": { "href": "/parents/1" } })),
    );
    transport.add_resource(loc("http://h/parents/1"), hal("p1", "http://h/parents/1", json!({})));

    let schemas = SchemaRegistry::new()
        .with(ResourceSchema::<Parent>::new("Parent").cache("parents", 10))
        .with(
            ResourceSchema::<Child>::new("Child")
                .cache("children", 10)
                .single("parent", |c: &mut Child, p| c.parent = Some(p))
                .rel("mother"),
        );
    let config = ResolverConfig {
        declarative_metadata_disabled: true,
        ..Default::default()
    };
    let resolver = resolver_with(transport, schemas, config);

    let child = resolver.resolve::<Child>(&loc("http://h/children/1")).await.unwrap();
    assert_eq!(child.read().parent.as_ref().unwrap().read().name, "p1");
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_statistics_and_clearing() {
    let session = Session::new(resolver_with(
        cyclic_transport(),
        family_schemas(ContainerKind::List),
        ResolverConfig::default(),
    ));

    session.resolve_str::<Child>("http://h/children/1").await.unwrap();
    let stats = session.statistics();
    assert_eq!(stats.fetch_count, 2);
    assert_eq!(stats.cached.get("children"), Some(&1));
    assert!(session.report().starts_with("fetches: 2"));

    session.clear_cache("children", true);
    assert_eq!(session.cached_count("children"), 0);
    assert!(session.statistics().misses.get("children").is_none());
    assert_eq!(session.statistics().misses.get("parents"), Some(&1));

    session.reset_statistics();
    assert_eq!(session.statistics().fetch_count, 0);

    session.clear_all_caches(true);
    assert_eq!(session.cached_count("parents"), 0);
}

#[tokio::test]
async fn test_concurrent_resolutions_share_caches() {
    let session = Arc::new(Session::new(resolver_with(
        brood_transport(),
        family_schemas(ContainerKind::Set),
        ResolverConfig::default(),
    )));

    let mut handles = Vec::new();
    for c in 1..=3 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            session
                .resolve_str::<Child>(&format!("http://h/children/{c}"))
                .await
        }));
    }

    for handle in handles {
        let child = handle.await.unwrap().unwrap();
        let parent = child.read().parent.clone().unwrap();
        assert_eq!(parent.read().name, "p1");
        assert_eq!(parent.read().children.len(), 3);
    }
    assert_eq!(session.cached_count("parents"), 1);
}
