use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};
use tracing::debug;

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    is_pcapng_magic, legacy_ts_to_seconds, linktype_for_interface, pcapng_ts_to_seconds,
    read_magic_and_rewind,
};

/// Packet source over a legacy PCAP or PCAPNG file, chosen by magic bytes.
pub struct PcapFileSource {
    inner: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let inner = create_reader(file)?;
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        let event = match &mut self.inner {
            PcapReader::Legacy { reader, linktype } => {
                next_event(reader, "pcap reader", |block| match block {
                    PcapBlockOwned::LegacyHeader(header) => {
                        *linktype = Some(header.network);
                        None
                    }
                    PcapBlockOwned::Legacy(packet) => Some(PacketEvent {
                        ts: Some(legacy_ts_to_seconds(packet.ts_sec, packet.ts_usec)),
                        linktype: linktype.unwrap_or(Linktype::ETHERNET),
                        data: packet.data.to_vec(),
                    }),
                    _ => None,
                })
            }
            PcapReader::Ng { reader, linktypes } => {
                next_event(reader, "pcapng reader", |block| match block {
                    PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                        linktypes.push(intf.linktype);
                        None
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => Some(PacketEvent {
                        ts: Some(pcapng_ts_to_seconds(packet.ts_high, packet.ts_low)),
                        linktype: linktype_for_interface(&linktypes[..], packet.if_id),
                        data: packet.data.to_vec(),
                    }),
                    _ => None,
                })
            }
        };
        Ok(event?)
    }
}

fn create_reader(mut file: File) -> Result<PcapReader, PcapSourceError> {
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        debug!("opening pcapng capture");
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            linktypes: Vec::new(),
        })
    } else {
        debug!("opening legacy pcap capture");
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
        })
    }
}

/// Drive `reader` until `on_block` yields an event or the file ends.
///
/// Blocks that yield nothing (headers, statistics) are consumed silently.
fn next_event<R, F>(
    reader: &mut R,
    context: &'static str,
    mut on_block: F,
) -> Result<Option<PacketEvent>, PcapSourceError>
where
    R: PcapReaderIterator,
    F: FnMut(PcapBlockOwned<'_>) -> Option<PacketEvent>,
{
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let event = on_block(block);
                reader.consume(offset);
                if event.is_some() {
                    return Ok(event);
                }
            }
            Err(PcapError::Eof) => return Ok(None),
            Err(PcapError::Incomplete(_)) => {
                reader.refill().map_err(|e| PcapSourceError::Pcap {
                    context,
                    message: format!("refill failed: {e}"),
                })?;
            }
            Err(e) => {
                return Err(PcapSourceError::Pcap {
                    context,
                    message: e.to_string(),
                });
            }
        }
    }
}
