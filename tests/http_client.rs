use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{ImageBuffer, ImageFormat, Rgb};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use warbler::app::{Session, WarblerError};
use warbler::cache::ImageCache;
use warbler::config::{Config, Endpoints, ShortenerKind, TimeoutConfig};
use warbler::domain::Status;
use warbler::fetcher::{HttpTransport, Transport};
use warbler::stream::CloseReason;

const TIMELINE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<statuses type="array">
  <status>
    <created_at>Wed Aug 27 13:08:45 +0000 2008</created_at>
    <id>900</id>
    <text>tea &amp; biscuits</text>
    <source>web</source>
    <user>
      <id>7</id>
      <name>Alice</name>
      <screen_name>alice</screen_name>
      <profile_image_url>http://a0.example.com/profile_images/7/me_normal.png</profile_image_url>
    </user>
  </status>
</statuses>"#;

fn config_for(server: &MockServer) -> Config {
    let base = server.uri();
    Config {
        consumer_key: "consumer".into(),
        consumer_secret: "consumer-secret".into(),
        token_key: Some("token".into()),
        token_secret: Some("token-secret".into()),
        endpoints: Endpoints {
            api_base: format!("{base}/1"),
            search_url: format!("{base}/search.atom"),
            stream_url: format!("{base}/2/user.json"),
            access_token_url: format!("{base}/oauth/access_token"),
            shortener_url: format!("{base}/create.php"),
        },
        ..Config::default()
    }
}

fn session_with(config: Config) -> (Session, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&TimeoutConfig::default()).unwrap());
    let session = Session::with_parts(config, transport, dir.path().join("images"));
    (session, dir)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 40, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_signed_timeline_fetch_moves_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/statuses/home_timeline.xml"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TIMELINE))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with(config_for(&server));
    let batch = session.fetch_timeline().await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].author.screen_name, "alice");
    assert_eq!(batch[0].display_text(), "tea & biscuits");
    assert_eq!(session.timeline_cursor().since_id(), Some(900));

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("OAuth "));
    assert!(auth.contains("oauth_signature_method=\"HMAC-SHA1\""));
    assert!(auth.contains("oauth_consumer_key=\"consumer\""));
}

#[tokio::test]
async fn test_since_id_sent_on_next_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/statuses/home_timeline.xml"))
        .and(query_param("since_id", "900"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<statuses type=\"array\"/>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/statuses/home_timeline.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TIMELINE))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with(config_for(&server));
    session.fetch_timeline().await.unwrap();
    let batch = session.fetch_timeline().await.unwrap();

    assert!(batch.is_empty());
    assert_eq!(session.timeline_cursor().since_id(), Some(900));
}

#[tokio::test]
async fn test_rejected_request_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/statuses/home_timeline.xml"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Could not authenticate you."))
        .mount(&server)
        .await;

    let config = Config {
        debug: 2,
        ..config_for(&server)
    };
    let (mut session, _dir) = session_with(config);
    let err = session.fetch_timeline().await.unwrap_err();

    match err {
        WarblerError::Status { code, body } => {
            assert_eq!(code, 401);
            assert_eq!(body.as_deref(), Some("Could not authenticate you."));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!session.timeline_cursor().is_set());
}

#[tokio::test]
async fn test_post_shortens_links_and_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/create.php"))
        .and(query_param("format", "simple"))
        .and(query_param("url", "http://example.com/a/very/long/path"))
        .respond_with(ResponseTemplate::new(200).set_body_string("http://is.gd/abc\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/statuses/update.xml"))
        .and(header_exists("authorization"))
        .and(body_string_contains("status=see+http%3A%2F%2Fis.gd%2Fabc"))
        .and(body_string_contains("source=warbler"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<status/>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        shortener: ShortenerKind::IsGd,
        ..config_for(&server)
    };
    let (session, _dir) = session_with(config);
    let sent = session
        .update_status("see http://example.com/a/very/long/path")
        .await
        .unwrap();
    assert_eq!(sent, "see http://is.gd/abc");
}

#[tokio::test]
async fn test_post_aborts_when_shortener_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/create.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/statuses/update.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        shortener: ShortenerKind::IsGd,
        ..config_for(&server)
    };
    let (session, _dir) = session_with(config);
    let err = session
        .update_status("see http://example.com/x")
        .await
        .unwrap_err();
    assert!(matches!(err, WarblerError::Shorten(_)));
}

#[tokio::test]
async fn test_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(body_string_contains("x_auth_mode=client_auth"))
        .and(body_string_contains("x_auth_username=alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=7-abc&oauth_token_secret=s3cret&user_id=7"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        token_key: None,
        token_secret: None,
        ..config_for(&server)
    };
    let (mut session, _dir) = session_with(config);
    let token = session.exchange_token("alice", "pw").await.unwrap();

    assert_eq!(token.key, "7-abc");
    assert_eq!(token.secret, "s3cret");
    assert!(session.has_token());
}

#[tokio::test]
async fn test_search_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.atom"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>tag:search.example.com,2005:search/rust</id>
  <title>rust - Search</title>
  <updated>2010-03-01T12:00:00Z</updated>
  <entry>
    <id>tag:search.example.com,2005:4242</id>
    <published>2010-03-01T12:00:00Z</published>
    <title>borrowck &amp; me</title>
    <updated>2010-03-01T12:00:00Z</updated>
    <link type="image/png" rel="image" href="http://a1.example.com/profile_images/9/bob.png"/>
    <author><name>bob (Bob B)</name><uri>http://example.com/bob</uri></author>
  </entry>
</feed>"#,
        ))
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with(config_for(&server));
    let batch = session.search("rust").await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].author.screen_name, "bob");
    assert_eq!(
        batch[0].author.avatar_url,
        "http://a1.example.com/profile_images/9/bob.png"
    );
    assert_eq!(session.search_cursor().since_id(), Some(4242));
}

#[tokio::test]
async fn test_image_cache_fetches_once_and_resizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile_images/7/me_normal.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png(96, 64)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&TimeoutConfig::default()).unwrap());
    let cache = ImageCache::new(dir.path().join("images"), transport);
    let url = format!("{}/profile_images/7/me_normal.png", server.uri());

    let first = cache.ensure(&url).await.unwrap();
    assert_eq!(first.file_name().unwrap(), "7_me_normal.png");
    assert_eq!(image::image_dimensions(&first).unwrap(), (48, 48));

    let second = cache.ensure(&url).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_image_cache_does_not_store_error_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&TimeoutConfig::default()).unwrap());
    let cache = ImageCache::new(dir.path(), transport);
    let url = format!("{}/profile_images/8/gone.png", server.uri());

    assert!(cache.ensure(&url).await.is_err());
    assert!(!dir.path().join("8_gone.png").exists());
}

#[tokio::test]
async fn test_stream_over_http() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"friends\":[1,2]}\r\n",
        "\r\n",
        "{\"id_str\":\"31\",\"text\":\"streamed\",\"user\":{\"id\":7,\"screen_name\":\"alice\"}}\r\n",
        "{\"delete\":{\"status\":{\"id\":30}}}\r\n",
    );
    Mock::given(method("GET"))
        .and(path("/2/user.json"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (session, _dir) = session_with(config_for(&server));
    let seen = Mutex::new(Vec::new());
    let notifier = |status: &Status, _: Option<&Path>| {
        seen.lock().unwrap().push(status.id.clone());
    };

    let outcome = session
        .stream(&notifier, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.reason, CloseReason::ServerClosed);
    assert_eq!(*seen.lock().unwrap(), vec!["31"]);
}

#[tokio::test]
async fn test_stream_rejected_at_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/user.json"))
        .respond_with(ResponseTemplate::new(420).set_body_string("Enhance your calm"))
        .mount(&server)
        .await;

    let (session, _dir) = session_with(config_for(&server));
    let noop = |_: &Status, _: Option<&Path>| {};
    let err = session
        .stream(&noop, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WarblerError::Status { code: 420, .. }));
}
