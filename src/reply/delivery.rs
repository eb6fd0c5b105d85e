use super::formatter::OutboundPost;
use crate::channels::{ChatTransport, TransportResult};
use crate::routing::responses::ANSIBLE_FAILED;

/// Send one post. Attachment bytes are read here, at post time; if the file
/// has vanished since formatting, the Ansible error text is posted instead.
pub async fn deliver(transport: &dyn ChatTransport, post: &OutboundPost) -> TransportResult<()> {
    match post {
        OutboundPost::Text { body } => transport.post_text(body).await,
        OutboundPost::Attachment {
            companion_text,
            filename,
            path,
        } => match tokio::fs::read(path).await {
            Ok(bytes) => {
                tracing::debug!(filename = %filename, bytes = bytes.len(), "Uploading attachment");
                transport.post_file(companion_text, filename, bytes).await
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Attachment unreadable at post time");
                transport.post_text(ANSIBLE_FAILED).await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::InboundMessage;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        texts: Mutex<Vec<String>>,
        files: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    #[async_trait]
    impl ChatTransport for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        async fn fetch_latest(&self) -> TransportResult<Option<InboundMessage>> {
            Ok(None)
        }
        async fn post_text(&self, text: &str) -> TransportResult<()> {
            self.texts.lock().push(text.to_string());
            Ok(())
        }
        async fn post_file(&self, text: &str, filename: &str, bytes: Vec<u8>) -> TransportResult<()> {
            self.files
                .lock()
                .push((text.to_string(), filename.to_string(), bytes));
            Ok(())
        }
        async fn health_check(&self) -> TransportResult<String> {
            Ok("recorder".into())
        }
    }

    #[tokio::test]
    async fn text_post_goes_to_post_text() {
        let transport = Recorder::default();
        deliver(&transport, &OutboundPost::text("Ok: Netconf"))
            .await
            .unwrap();
        assert_eq!(*transport.texts.lock(), vec!["Ok: Netconf".to_string()]);
        assert!(transport.files.lock().is_empty());
    }

    #[tokio::test]
    async fn attachment_uploads_file_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("show_run_r1.txt");
        std::fs::write(&path, "hostname R1\n").unwrap();
        let transport = Recorder::default();

        let post = OutboundPost::Attachment {
            companion_text: "show running config".into(),
            filename: "show_run_r1.txt".into(),
            path,
        };
        deliver(&transport, &post).await.unwrap();

        let files = transport.files.lock();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "show running config");
        assert_eq!(files[0].1, "show_run_r1.txt");
        assert_eq!(files[0].2, b"hostname R1\n");
    }

    #[tokio::test]
    async fn vanished_attachment_falls_back_to_text() {
        let tmp = TempDir::new().unwrap();
        let transport = Recorder::default();
        let post = OutboundPost::Attachment {
            companion_text: "show running config".into(),
            filename: "gone.txt".into(),
            path: tmp.path().join("gone.txt"),
        };
        deliver(&transport, &post).await.unwrap();
        assert_eq!(*transport.texts.lock(), vec!["Error: Ansible".to_string()]);
        assert!(transport.files.lock().is_empty());
    }
}
