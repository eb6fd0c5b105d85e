//! NETCONF 1.0 over the `ssh -s netconf` subsystem.
//!
//! Each operation opens one session: client hello, a single rpc, then
//! close-session, all framed with the base 1.0 end-of-message marker.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use super::process::run_process;
use super::ssh::{SshLauncher, SshRemote};
use super::traits::{BackendError, BackendResult, InterfaceState, StructuredConfigBackend};
use crate::command::BackendKind;
use crate::config::InterfaceConfig;

const EOM: &str = "]]>]]>";
const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
const IF_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";
const IP_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-ip";
const IANA_IF_NS: &str = "urn:ietf:params:xml:ns:yang:iana-if-type";
const RPC_MESSAGE_ID: u32 = 101;

pub fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn edit_config(interface_body: &str) -> String {
    format!(
        "<edit-config><target><running/></target><config>\
         <interfaces xmlns=\"{IF_NS}\">{interface_body}</interfaces>\
         </config></edit-config>"
    )
}

pub fn create_payload(interface: &InterfaceConfig) -> String {
    edit_config(&format!(
        "<interface><name>{}</name><description>{}</description>\
         <type xmlns:ianaift=\"{IANA_IF_NS}\">ianaift:softwareLoopback</type>\
         <enabled>true</enabled>\
         <ipv4 xmlns=\"{IP_NS}\"><address><ip>{}</ip><netmask>{}</netmask></address></ipv4>\
         </interface>",
        xml_escape(&interface.name()),
        xml_escape(&interface.description()),
        xml_escape(&interface.ipv4_address),
        xml_escape(&interface.netmask),
    ))
}

pub fn delete_payload(interface: &InterfaceConfig) -> String {
    edit_config(&format!(
        "<interface operation=\"delete\"><name>{}</name></interface>",
        xml_escape(&interface.name())
    ))
}

pub fn set_enabled_payload(interface: &InterfaceConfig, enabled: bool) -> String {
    edit_config(&format!(
        "<interface><name>{}</name><enabled>{enabled}</enabled></interface>",
        xml_escape(&interface.name())
    ))
}

pub fn status_payload(interface: &InterfaceConfig) -> String {
    format!(
        "<get><filter type=\"subtree\"><interfaces-state xmlns=\"{IF_NS}\">\
         <interface><name>{}</name></interface>\
         </interfaces-state></filter></get>",
        xml_escape(&interface.name())
    )
}

/// Full client stream for one rpc: hello, rpc, close-session.
pub fn frame_session(operation: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <hello xmlns=\"{BASE_NS}\"><capabilities>\
         <capability>urn:ietf:params:netconf:base:1.0</capability>\
         </capabilities></hello>{EOM}\n\
         <?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rpc message-id=\"{RPC_MESSAGE_ID}\" xmlns=\"{BASE_NS}\">{operation}</rpc>{EOM}\n\
         <?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rpc message-id=\"{}\" xmlns=\"{BASE_NS}\"><close-session/></rpc>{EOM}\n",
        RPC_MESSAGE_ID + 1
    )
}

/// Pull the reply to our rpc out of the server's framed output.
pub fn extract_reply(stream: &str) -> BackendResult<&str> {
    let marker = format!("message-id=\"{RPC_MESSAGE_ID}\"");
    stream
        .split(EOM)
        .map(str::trim)
        .find(|frame| frame.contains("rpc-reply") && frame.contains(&marker))
        .ok_or_else(|| BackendError::Protocol("no rpc-reply for request".into()))
}

fn tag_regex(cell: &'static OnceLock<Regex>, tag: &str) -> &'static Regex {
    cell.get_or_init(|| {
        // Tags may carry any namespace prefix, e.g. `<nc:ok/>` or `<if:admin-status>`.
        Regex::new(&format!(r"<(?:[\w-]+:)?{tag}[\s>/]")).expect("Invalid regex")
    })
}

fn ok_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    tag_regex(&CELL, "ok")
}

fn rpc_error_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    tag_regex(&CELL, "rpc-error")
}

fn interface_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    tag_regex(&CELL, "interface")
}

fn error_message_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r"<(?:[\w-]+:)?error-message[^>]*>([^<]*)<").expect("Invalid regex")
    })
}

fn leaf_regex(cell: &'static OnceLock<Regex>, tag: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(&format!(
            r"<(?:[\w-]+:)?{tag}>\s*([^<]*?)\s*</(?:[\w-]+:)?{tag}>"
        ))
        .expect("Invalid regex")
    })
}

fn admin_status_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    leaf_regex(&CELL, "admin-status")
}

fn oper_status_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    leaf_regex(&CELL, "oper-status")
}

fn leaf_value(reply: &str, leaf: &Regex) -> Option<String> {
    leaf.captures(reply).map(|c| c[1].to_string())
}

fn rejection(reply: &str) -> Option<BackendError> {
    if !rpc_error_regex().is_match(reply) {
        return None;
    }
    let message = error_message_regex()
        .captures(reply)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "rpc-error".into());
    Some(BackendError::Rejected(message))
}

pub fn check_ok(reply: &str) -> BackendResult<()> {
    if let Some(err) = rejection(reply) {
        return Err(err);
    }
    if ok_regex().is_match(reply) {
        Ok(())
    } else {
        Err(BackendError::Protocol("rpc-reply without <ok/>".into()))
    }
}

pub fn parse_interface_state(reply: &str) -> BackendResult<InterfaceState> {
    if let Some(err) = rejection(reply) {
        return Err(err);
    }
    if !interface_regex().is_match(reply) {
        return Ok(InterfaceState::Absent);
    }
    let admin = leaf_value(reply, admin_status_regex()).unwrap_or_else(|| "down".into());
    let oper = leaf_value(reply, oper_status_regex()).unwrap_or_else(|| "down".into());
    Ok(InterfaceState::from_statuses(&admin, &oper))
}

pub struct NetconfBackend {
    launcher: SshLauncher,
    port: u16,
    interface: InterfaceConfig,
}

impl NetconfBackend {
    pub fn new(launcher: SshLauncher, port: u16, interface: InterfaceConfig) -> Self {
        Self {
            launcher,
            port,
            interface,
        }
    }

    async fn exchange(&self, target: &str, operation: &str) -> BackendResult<String> {
        let command = self
            .launcher
            .command(target, self.port, SshRemote::Subsystem("netconf"));
        let session = frame_session(operation);
        let output = run_process(command, Some(session.as_bytes())).await?;
        let reply = extract_reply(&output.stdout)?.to_string();
        tracing::debug!(target, reply_bytes = reply.len(), "NETCONF reply received");
        Ok(reply)
    }

    async fn edit(&self, target: &str, payload: String) -> BackendResult<()> {
        let reply = self.exchange(target, &payload).await?;
        check_ok(&reply)
    }
}

#[async_trait]
impl StructuredConfigBackend for NetconfBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Netconf
    }

    async fn create(&self, target: &str) -> BackendResult<()> {
        self.edit(target, create_payload(&self.interface)).await
    }

    async fn delete(&self, target: &str) -> BackendResult<()> {
        self.edit(target, delete_payload(&self.interface)).await
    }

    async fn enable(&self, target: &str) -> BackendResult<()> {
        self.edit(target, set_enabled_payload(&self.interface, true))
            .await
    }

    async fn disable(&self, target: &str) -> BackendResult<()> {
        self.edit(target, set_enabled_payload(&self.interface, false))
            .await
    }

    async fn status(&self, target: &str) -> BackendResult<InterfaceState> {
        let reply = self
            .exchange(target, &status_payload(&self.interface))
            .await?;
        parse_interface_state(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_HELLO: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>\
        <capability>urn:ietf:params:netconf:base:1.0</capability></capabilities>\
        <session-id>42</session-id></hello>]]>]]>";

    fn stream(reply_body: &str) -> String {
        format!(
            "{SERVER_HELLO}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <rpc-reply xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\" message-id=\"101\">\
             {reply_body}</rpc-reply>]]>]]>\
             <rpc-reply message-id=\"102\"><ok/></rpc-reply>]]>]]>"
        )
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(xml_escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
    }

    #[test]
    fn create_payload_carries_address_and_type() {
        let payload = create_payload(&InterfaceConfig::default());
        assert!(payload.contains("<name>Loopback66070077</name>"));
        assert!(payload.contains("<ip>172.0.77.1</ip>"));
        assert!(payload.contains("<netmask>255.255.255.0</netmask>"));
        assert!(payload.contains("ianaift:softwareLoopback"));
        assert!(payload.contains("<target><running/></target>"));
    }

    #[test]
    fn delete_and_toggle_payloads() {
        let iface = InterfaceConfig::default();
        assert!(delete_payload(&iface).contains("operation=\"delete\""));
        assert!(set_enabled_payload(&iface, false).contains("<enabled>false</enabled>"));
        assert!(status_payload(&iface).contains("<interfaces-state"));
    }

    #[test]
    fn session_frames_three_messages() {
        let framed = frame_session("<get/>");
        assert_eq!(framed.matches(EOM).count(), 3);
        assert!(framed.contains("message-id=\"101\""));
        assert!(framed.contains("<close-session/>"));
    }

    #[test]
    fn extracts_reply_for_our_message_id() {
        let raw = stream("<ok/>");
        let reply = extract_reply(&raw).unwrap();
        assert!(reply.contains("message-id=\"101\""));
        assert!(check_ok(reply).is_ok());
    }

    #[test]
    fn missing_reply_is_protocol_error() {
        assert!(matches!(
            extract_reply(SERVER_HELLO),
            Err(BackendError::Protocol(_))
        ));
    }

    #[test]
    fn rpc_error_is_rejected_with_message() {
        let reply = "<rpc-reply message-id=\"101\"><rpc-error><error-type>application</error-type>\
                     <error-message xml:lang=\"en\">data missing</error-message></rpc-error></rpc-reply>";
        match check_ok(reply) {
            Err(BackendError::Rejected(msg)) => assert_eq!(msg, "data missing"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn prefixed_ok_is_accepted() {
        assert!(check_ok("<nc:rpc-reply message-id=\"101\"><nc:ok/></nc:rpc-reply>").is_ok());
    }

    #[test]
    fn status_reads_admin_status() {
        let up = "<rpc-reply message-id=\"101\"><data><interfaces-state xmlns=\"urn:ietf:params:xml:ns:yang:ietf-interfaces\">\
                  <interface><name>Loopback66070077</name><admin-status>up</admin-status>\
                  <oper-status>up</oper-status></interface></interfaces-state></data></rpc-reply>";
        assert_eq!(parse_interface_state(up).unwrap(), InterfaceState::Enabled);

        let down = up.replace(
            "<admin-status>up</admin-status>",
            "<admin-status>down</admin-status>",
        );
        assert_eq!(
            parse_interface_state(&down).unwrap(),
            InterfaceState::Disabled
        );
    }

    #[test]
    fn empty_data_means_absent() {
        let reply = "<rpc-reply message-id=\"101\"><data/></rpc-reply>";
        assert_eq!(
            parse_interface_state(reply).unwrap(),
            InterfaceState::Absent
        );
    }

    #[test]
    fn interfaces_state_container_is_not_an_interface() {
        let reply = "<rpc-reply message-id=\"101\"><data><interfaces-state xmlns=\"x\"/></data></rpc-reply>";
        assert_eq!(
            parse_interface_state(reply).unwrap(),
            InterfaceState::Absent
        );
    }

    #[cfg(unix)]
    fn fake_ssh(dir: &std::path::Path, reply_body: &str) -> NetconfBackend {
        use crate::config::{DeviceConfig, SshConfig};
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ssh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$@\" > '{args}'\ncat > '{request}'\nprintf '%s' '{reply}'\n",
                args = dir.join("args").display(),
                request = dir.join("request").display(),
                reply = stream(reply_body),
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ssh = SshConfig {
            program: script.display().to_string(),
            ..SshConfig::default()
        };
        NetconfBackend::new(
            SshLauncher::new(&ssh, &DeviceConfig::default()),
            830,
            InterfaceConfig::default(),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn create_runs_one_session_over_the_netconf_subsystem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = fake_ssh(tmp.path(), "<ok/>");

        backend.create("10.0.15.61").await.unwrap();

        let args = std::fs::read_to_string(tmp.path().join("args")).unwrap();
        assert!(args.contains("-p 830"));
        assert!(args.trim_end().ends_with("-s 10.0.15.61 netconf"));
        let request = std::fs::read_to_string(tmp.path().join("request")).unwrap();
        assert_eq!(request.matches(EOM).count(), 3);
        assert!(request.contains("<edit-config>"));
        assert!(request.contains("<name>Loopback66070077</name>"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn status_is_read_from_the_session_reply() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = fake_ssh(
            tmp.path(),
            "<data><interfaces-state xmlns=\"urn:ietf:params:xml:ns:yang:ietf-interfaces\">\
             <interface><name>Loopback66070077</name><admin-status>down</admin-status>\
             <oper-status>down</oper-status></interface></interfaces-state></data>",
        );

        assert_eq!(
            backend.status("10.0.15.61").await.unwrap(),
            InterfaceState::Disabled
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejected_edit_surfaces_the_error_message() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = fake_ssh(
            tmp.path(),
            "<rpc-error><error-message>data-missing</error-message></rpc-error>",
        );

        match backend.delete("10.0.15.61").await {
            Err(BackendError::Rejected(msg)) => assert_eq!(msg, "data-missing"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }
}
