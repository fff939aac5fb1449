#![no_main]

use libfuzzer_sys::fuzz_target;
use cmcauth::cmc::{CmcEnvelope, PkiData};
use cmcauth::crmf::CertReqMsg;
use cmcauth::csr::CertificationRequest;

fuzz_target!(|data: &[u8]| {
    let (which, data) = match data.split_first() {
        Some((first, data)) => (*first, data),
        None => return,
    };

    match which % 5 {
        0 => { let _ = CmcEnvelope::decode(data); },
        1 => { let _ = PkiData::decode(bytes::Bytes::copy_from_slice(data)); },
        2 => { let _ = CertificationRequest::decode(data); },
        3 => {
            let _ = bcder::Mode::Ber.decode(data, CertReqMsg::take_from);
        },
        4 => {
            if let Ok(data) = std::str::from_utf8(data) {
                let _ = CmcEnvelope::decode_blob(data);
            }
        },
        _ => panic!("what?"),
    }
});
