//! Object, index document and range integration tests.

#[cfg(test)]
mod tests {
    use crate::{cleanup_prefix, http_client, put_object, s3_client, site_url, test_prefix};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_existing_object() {
        let client = s3_client();
        let prefix = test_prefix("object");
        put_object(&client, &format!("{prefix}/hello.txt"), b"hello, bucketsite!").await;

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/hello.txt")))
            .send()
            .await
            .expect("get object");

        assert_eq!(resp.status(), 200);
        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(resp.text().await.expect("body"), "hello, bucketsite!");

        cleanup_prefix(&client, &prefix).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_index_document() {
        let client = s3_client();
        let prefix = test_prefix("index");
        put_object(&client, &format!("{prefix}/docs/index.html"), b"<h1>docs</h1>").await;

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/docs")))
            .send()
            .await
            .expect("get directory");

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.expect("body"), "<h1>docs</h1>");

        cleanup_prefix(&client, &prefix).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_byte_range() {
        let client = s3_client();
        let prefix = test_prefix("range");
        put_object(&client, &format!("{prefix}/digits.txt"), b"0123456789").await;

        let resp = http_client()
            .get(site_url(&format!("/{prefix}/digits.txt")))
            .header("range", "bytes=2-5")
            .send()
            .await
            .expect("get range");

        assert_eq!(resp.status(), 206);
        assert_eq!(
            resp.headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
            Some("bytes 2-5/10")
        );
        assert_eq!(resp.text().await.expect("body"), "2345");

        cleanup_prefix(&client, &prefix).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_head_without_body() {
        let client = s3_client();
        let prefix = test_prefix("head");
        put_object(&client, &format!("{prefix}/a.txt"), b"abc").await;

        let resp = http_client()
            .head(site_url(&format!("/{prefix}/a.txt")))
            .send()
            .await
            .expect("head object");

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok()),
            Some("3")
        );

        cleanup_prefix(&client, &prefix).await;
    }
}
