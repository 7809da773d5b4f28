//! Not-found and fallback page integration tests.

#[cfg(test)]
mod tests {
    use crate::{
        NOT_FOUND_PAGE, cleanup_prefix, http_client, put_object, s3_client, site_url, test_prefix,
    };

    const NOT_FOUND_BODY: &[u8] = b"<h1>custom not found</h1>";

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_fallback_page_with_not_found_status() {
        let client = s3_client();
        put_object(&client, NOT_FOUND_PAGE, NOT_FOUND_BODY).await;
        let prefix = test_prefix("fallback");

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/missing.html")))
            .send()
            .await
            .expect("get missing");

        assert_eq!(resp.status(), 404);
        assert_eq!(
            resp.text().await.expect("body").as_bytes(),
            NOT_FOUND_BODY
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_ignore_range_on_fallback_page() {
        let client = s3_client();
        put_object(&client, NOT_FOUND_PAGE, NOT_FOUND_BODY).await;
        let prefix = test_prefix("fallback-range");

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/missing.html")))
            .header("range", "bytes=0-3")
            .send()
            .await
            .expect("get missing with range");

        assert_eq!(resp.status(), 404);
        assert!(!resp.headers().contains_key("content-range"));
        assert_eq!(
            resp.text().await.expect("body").as_bytes(),
            NOT_FOUND_BODY
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_existing_object_next_to_fallback() {
        let client = s3_client();
        put_object(&client, NOT_FOUND_PAGE, NOT_FOUND_BODY).await;
        let prefix = test_prefix("present");
        put_object(&client, &format!("{prefix}/page.html"), b"<p>here</p>").await;

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/page.html")))
            .send()
            .await
            .expect("get page");

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.expect("body"), "<p>here</p>");

        cleanup_prefix(&client, &prefix).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsupported_method() {
        let resp = http_client()
            .post(site_url("/anything"))
            .send()
            .await
            .expect("post");

        assert_eq!(resp.status(), 405);
    }
}
