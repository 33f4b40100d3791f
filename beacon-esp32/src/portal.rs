//! Captive configuration page
//!
//! Serves one form pre-filled with the current parameters. The browser posts
//! the form as JSON; submissions are handed to the WiFi task over a channel.

use std::sync::mpsc::Sender;

use anyhow::anyhow;
use beacon_proto::{DeviceConfig, Field};
use esp_idf_svc::{
    http::{
        server::{Configuration as HttpServerConfiguration, EspHttpServer},
        Method,
    },
    io::{utils, Write},
};
use log::*;
use serde::Deserialize;

const MAX_FORM_LEN: usize = 1024;

/// What the user submitted, unvalidated
#[derive(Debug, Deserialize)]
pub struct PortalForm {
    pub wifi_ssid: String,
    #[serde(default)]
    pub wifi_password: String,
    #[serde(flatten)]
    pub config: DeviceConfig,
}

/// Start the HTTP server; it stops when the returned handle is dropped
pub fn serve(prefill: &DeviceConfig, tx: Sender<PortalForm>) -> anyhow::Result<EspHttpServer<'static>> {
    let page = render(prefill);
    let mut server = EspHttpServer::new(&HttpServerConfiguration::default())?;

    server.fn_handler::<anyhow::Error, _>("/", Method::Get, move |req| {
        req.into_response(200, None, &[("Content-Type", "text/html; charset=utf-8")])?
            .write_all(page.as_bytes())?;
        Ok(())
    })?;

    server.fn_handler::<anyhow::Error, _>("/save", Method::Post, move |mut req| {
        let mut buf = [0u8; MAX_FORM_LEN];
        let bytes_read = utils::try_read_full(&mut req, &mut buf).map_err(|e| e.0)?;

        let form: PortalForm = serde_json::from_slice(&buf[..bytes_read])?;
        info!("Portal form received for SSID '{}'", form.wifi_ssid);
        tx.send(form).map_err(|_| anyhow!("portal already closed"))?;

        req.into_ok_response()?
            .write_all(b"Saved. The device is connecting, you can close this page.")?;
        Ok(())
    })?;

    Ok(server)
}

fn render(prefill: &DeviceConfig) -> String {
    let mut inputs = String::new();
    for field in Field::ALL {
        inputs.push_str(&format!(
            "<label>{label}<input name=\"{key}\" value=\"{value}\"></label>\n",
            label = field.label(),
            key = field.key(),
            value = escape(prefill.get(field)),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html><head><meta name="viewport" content="width=device-width">
<title>BLE Beacon Setup</title>
<style>label{{display:block;margin:8px 0}}input{{display:block;width:100%}}</style>
</head><body>
<h2>BLE Beacon Setup</h2>
<form id="f">
<label>WiFi SSID<input name="wifi_ssid"></label>
<label>WiFi Password<input name="wifi_password" type="password"></label>
{inputs}<button>Save</button>
</form>
<p id="r"></p>
<script>
document.getElementById('f').onsubmit = async (e) => {{
  e.preventDefault();
  const body = Object.fromEntries(new FormData(e.target));
  const res = await fetch('/save', {{method: 'POST', body: JSON.stringify(body)}});
  document.getElementById('r').textContent = await res.text();
}};
</script>
</body></html>"#
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
