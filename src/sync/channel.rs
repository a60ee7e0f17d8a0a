use crate::config::{DescriptionPolicy, DestinationConfig};
use crate::feed::{OutputChannel, RemoteChannel};

/// Title used when neither the configuration nor the remote feed has one.
pub const FALLBACK_TITLE: &str = "Filtered Feed";

/// Builds the output channel metadata for a destination.
pub fn resolve_channel(config: &DestinationConfig, remote: &RemoteChannel) -> OutputChannel {
    let title = config
        .title
        .clone()
        .or_else(|| remote.title.clone())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let description = match &config.description {
        DescriptionPolicy::Suppress => None,
        DescriptionPolicy::Literal(text) => Some(text.clone()),
        DescriptionPolicy::Remote => Some(
            remote
                .description
                .clone()
                .or_else(|| remote.subtitle.clone())
                .or_else(|| remote.summary.clone())
                .unwrap_or_else(|| format!("Filtered episodes from {}", title)),
        ),
    };

    OutputChannel {
        title,
        link: remote.link.clone(),
        description,
        private: config.private,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn destination(title: Option<&str>, description: DescriptionPolicy) -> DestinationConfig {
        DestinationConfig {
            title: title.map(String::from),
            description,
            ..DestinationConfig::new("https://example.com/feed.xml")
        }
    }

    fn remote() -> RemoteChannel {
        RemoteChannel {
            title: Some("Remote Show".into()),
            link: Some("https://example.com".into()),
            description: Some("Remote description".into()),
            subtitle: Some("Remote subtitle".into()),
            summary: Some("Remote summary".into()),
        }
    }

    #[test]
    fn test_title_override_wins() {
        let channel = resolve_channel(
            &destination(Some("Mine"), DescriptionPolicy::Remote),
            &remote(),
        );
        assert_eq!(channel.title, "Mine");
        assert_eq!(channel.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_title_from_remote_then_fallback() {
        let config = destination(None, DescriptionPolicy::Remote);
        assert_eq!(resolve_channel(&config, &remote()).title, "Remote Show");
        assert_eq!(
            resolve_channel(&config, &RemoteChannel::default()).title,
            FALLBACK_TITLE
        );
    }

    #[test]
    fn test_description_preference_order() {
        let config = destination(None, DescriptionPolicy::Remote);
        let mut remote = remote();
        assert_eq!(
            resolve_channel(&config, &remote).description.as_deref(),
            Some("Remote description")
        );

        remote.description = None;
        assert_eq!(
            resolve_channel(&config, &remote).description.as_deref(),
            Some("Remote subtitle")
        );

        remote.subtitle = None;
        assert_eq!(
            resolve_channel(&config, &remote).description.as_deref(),
            Some("Remote summary")
        );

        remote.summary = None;
        assert_eq!(
            resolve_channel(&config, &remote).description.as_deref(),
            Some("Filtered episodes from Remote Show")
        );
    }

    #[test]
    fn test_synthesized_description_uses_resolved_title() {
        let config = destination(Some("Override"), DescriptionPolicy::Remote);
        let channel = resolve_channel(&config, &RemoteChannel::default());
        assert_eq!(
            channel.description.as_deref(),
            Some("Filtered episodes from Override")
        );
    }

    #[test]
    fn test_description_suppressed() {
        let config = destination(None, DescriptionPolicy::Suppress);
        assert_eq!(resolve_channel(&config, &remote()).description, None);
    }

    #[test]
    fn test_description_literal() {
        let config = destination(None, DescriptionPolicy::Literal("Custom".into()));
        assert_eq!(
            resolve_channel(&config, &remote()).description.as_deref(),
            Some("Custom")
        );
    }

    #[test]
    fn test_private_flag_copied() {
        let mut config = destination(None, DescriptionPolicy::Remote);
        assert!(resolve_channel(&config, &remote()).private);
        config.private = false;
        assert!(!resolve_channel(&config, &remote()).private);
    }
}
