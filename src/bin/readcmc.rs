use std::{env, fs};
use bytes::Bytes;
use cmcauth::cmc::{CmcEnvelope, TaggedRequest};
use cmcauth::util::base64;


fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            println!("Usage: readcmc <path>");
            return
        }
    };
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            println!("Can’t read file: {}", err);
            return;
        }
    };

    // DER encoded requests start with a SEQUENCE tag which is never valid
    // Base 64.
    let der = if data.first() == Some(&0x30) {
        data
    }
    else {
        match base64::Cmc.decode_armored_bytes(&data) {
            Ok(der) => der,
            Err(err) => {
                println!("Can’t decode Base 64: {}", err);
                return
            }
        }
    };

    let envelope = match CmcEnvelope::decode(Bytes::from(der)) {
        Ok(envelope) => envelope,
        Err(err) => {
            println!("Can’t decode CMC request: {}", err);
            return
        }
    };

    print!("Digest algorithms:");
    for alg in envelope.digest_algorithms() {
        print!(" {}", alg);
    }
    println!();
    println!("Certificates:");
    for cert in envelope.certificates() {
        println!(
            "  {} (serial {}, issuer {})",
            cert.subject(), cert.serial_number(), cert.issuer()
        );
    }
    println!("Signers:");
    for info in envelope.signer_infos() {
        println!(
            "  {} ({}, {})",
            info.sid(), info.digest_algorithm(),
            if info.signed_attrs().is_some() {
                "signed attributes"
            }
            else {
                "no signed attributes"
            }
        );
    }

    let data = envelope.pki_data();
    println!("Controls:");
    for attr in data.controls() {
        println!("  {}: {}", attr.body_part_id(), attr.attr_type());
    }
    if data.is_revocation() {
        println!("Revocations:");
        for req in data.revocations() {
            println!(
                "  serial {} of {}: {}",
                req.serial(), req.issuer(), req.reason()
            );
        }
    }
    else {
        println!("Certificate requests:");
        for req in data.requests() {
            let kind = match *req {
                TaggedRequest::Pkcs10 { .. } => "PKCS #10",
                TaggedRequest::Crmf(_) => "CRMF",
            };
            match req.subject() {
                Some(subject) => {
                    println!(
                        "  {} {}: {}", kind, req.correlation_id(), subject
                    )
                }
                None => {
                    println!(
                        "  {} {}: no subject", kind, req.correlation_id()
                    )
                }
            }
        }
    }
}
