use super::*;

fn query(source: Option<&str>) -> FeedQuery {
    FeedQuery { source: source.map(str::to_owned), cursor: None }
}

#[test]
fn missing_or_empty_source_is_for_you() {
    assert_eq!(query(None).source(), Ok(FeedSource::ForYou));
    assert_eq!(query(Some("")).source(), Ok(FeedSource::ForYou));
}

#[test]
fn known_sources_parse() {
    assert_eq!(query(Some("following")).source(), Ok(FeedSource::Following));
    assert_eq!(query(Some("liked")).source(), Ok(FeedSource::Liked));
}

#[test]
fn unknown_source_is_bad_request() {
    assert_eq!(query(Some("popular")).source(), Err(StatusCode::BAD_REQUEST));
}
