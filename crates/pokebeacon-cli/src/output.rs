//! Rendering of discovery results for the terminal

use std::io::Write;

use serde::Serialize;

use pokebeacon_core::PeerAdvertisement;

use crate::error::Result;

/// Serializable view of one discovered peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerReport {
    pub name: String,
    pub id: String,
    pub payload: String,
    pub rssi: Option<i16>,
    pub sightings: u32,
    pub first_seen_after_ms: u64,
}

impl From<&PeerAdvertisement> for PeerReport {
    fn from(peer: &PeerAdvertisement) -> Self {
        Self {
            name: peer.raw_name.clone(),
            id: peer.id.to_string(),
            payload: peer.payload.clone(),
            rssi: peer.rssi,
            sightings: peer.sightings,
            first_seen_after_ms: peer.first_seen_after.as_millis() as u64,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonLine<'a> {
    Peer(&'a PeerReport),
    Summary { peers: &'a [PeerReport] },
}

/// Writes scan and advertise progress as text or JSON lines
pub struct Renderer<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn peer_found(&mut self, peer: &PeerAdvertisement) -> Result<()> {
        let report = PeerReport::from(peer);
        if self.json {
            self.json_line(&JsonLine::Peer(&report))
        } else {
            writeln!(
                self.out,
                "+ {} ({}, {})",
                report.payload,
                report.id,
                rssi_label(report.rssi)
            )?;
            Ok(())
        }
    }

    pub fn summary(&mut self, peers: &[PeerAdvertisement]) -> Result<()> {
        let reports: Vec<PeerReport> = peers.iter().map(PeerReport::from).collect();
        if self.json {
            return self.json_line(&JsonLine::Summary { peers: &reports });
        }

        if reports.is_empty() {
            writeln!(self.out, "no peers found")?;
            return Ok(());
        }

        writeln!(self.out, "{} peer(s) discovered:", reports.len())?;
        for report in &reports {
            writeln!(
                self.out,
                "  {:<20} {:<20} {:>6}ms  seen {}x",
                report.payload, report.id, report.first_seen_after_ms, report.sightings
            )?;
        }
        Ok(())
    }

    /// Plain status line; suppressed in JSON mode
    pub fn status(&mut self, message: &str) -> Result<()> {
        if !self.json {
            writeln!(self.out, "{}", message)?;
        }
        Ok(())
    }

    fn json_line(&mut self, line: &JsonLine<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, line)?;
        writeln!(self.out)?;
        Ok(())
    }
}

fn rssi_label(rssi: Option<i16>) -> String {
    match rssi {
        Some(rssi) => format!("{} dBm", rssi),
        None => "rssi n/a".to_string(),
    }
}
