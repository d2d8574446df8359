//! End-to-end runs of the assembly and signing pipelines over an
//! in-memory store.

use domain::base::iana::Rtype;
use domain::crypto::sign::{generate, GenerateParams};
use domain::rdata::ZoneRecordData;
use domain::utils::base64;

use authzone::pipeline::AuthNs;
use authzone::store::{paths, BlobStore, MemStore};
use authzone::zone::StoredRecord;

const DOMAIN: &str = "example.test";

const CONFIG: &str = r#"
[main]
domain = "example.test."
host = "192.0.2.1"

[ksk]
public = "ksk.key"
private = "ksk.private"

[zsk]
public = "zsk.key"
private = "zsk.private"
"#;

fn generate_key(flags: u16) -> (String, String, u16) {
    let (secret, dnskey) = generate(GenerateParams::Ed25519, flags).unwrap();
    let private = secret.display_as_bind().to_string();
    (
        format!("example.test. IN DNSKEY {dnskey}"),
        private,
        dnskey.key_tag(),
    )
}

fn fake_pem(body: &[u8]) -> String {
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        base64::encode_string(body)
    )
}

/// A store seeded with everything `init` needs, plus the two key tags.
fn seeded_store() -> (MemStore, u16, u16) {
    let (ksk_public, ksk_private, ksk_tag) = generate_key(257);
    let (zsk_public, zsk_private, zsk_tag) = generate_key(256);
    let store = MemStore::new()
        .with(&paths::config(DOMAIN), CONFIG)
        .with(&paths::certificate(DOMAIN), &fake_pem(b"the certificate"))
        .with(&paths::key_file(DOMAIN, "ksk", "ksk.key"), &ksk_public)
        .with(&paths::key_file(DOMAIN, "ksk", "ksk.private"), &ksk_private)
        .with(&paths::key_file(DOMAIN, "zsk", "zsk.key"), &zsk_public)
        .with(&paths::key_file(DOMAIN, "zsk", "zsk.private"), &zsk_private);
    (store, ksk_tag, zsk_tag)
}

fn rrsigs_covering(records: &[StoredRecord], rtype: Rtype) -> Vec<StoredRecord> {
    records
        .iter()
        .filter(|record| match record.data() {
            ZoneRecordData::Rrsig(rrsig) => rrsig.type_covered() == rtype,
            _ => false,
        })
        .cloned()
        .collect()
}

fn key_tag(record: &StoredRecord) -> u16 {
    match record.data() {
        ZoneRecordData::Rrsig(rrsig) => rrsig.key_tag(),
        _ => panic!("not an RRSIG"),
    }
}

#[tokio::test]
async fn init_signs_every_rrset_with_the_right_key() {
    let (store, ksk_tag, zsk_tag) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.init().await.unwrap();

    let zone = ns.authority().zone();
    let records = zone.to_vec();

    // The apex DNSKEY RRset carries the KSK's signature and nothing else.
    let dnskey_sigs = rrsigs_covering(&records, Rtype::DNSKEY);
    assert_eq!(dnskey_sigs.len(), 1);
    assert_eq!(key_tag(&dnskey_sigs[0]), ksk_tag);

    // One ZSK signature per remaining RRset: SOA and NS at the apex, A at
    // three owners, TLSA at two.
    for (rtype, count) in [
        (Rtype::SOA, 1),
        (Rtype::NS, 1),
        (Rtype::A, 3),
        (Rtype::TLSA, 2),
    ] {
        let sigs = rrsigs_covering(&records, rtype);
        assert_eq!(sigs.len(), count, "wrong number of RRSIGs for {rtype}");
        for sig in &sigs {
            assert_eq!(key_tag(sig), zsk_tag, "wrong key for {rtype}");
        }
    }

    // RRSIGs themselves are never signed.
    assert!(rrsigs_covering(&records, Rtype::RRSIG).is_empty());

    // Both DNSKEY records made it into the apex RRset.
    let dnskeys: Vec<_> = records
        .iter()
        .filter(|record| record.rtype() == Rtype::DNSKEY)
        .collect();
    assert_eq!(dnskeys.len(), 2);
    for dnskey in dnskeys {
        assert_eq!(format!("{}", dnskey.owner()), DOMAIN);
    }
}

#[tokio::test]
async fn init_registers_the_zsk_with_the_authority() {
    let (store, _, zsk_tag) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.init().await.unwrap();

    let zsk = ns.authority().active_zsk().unwrap();
    assert_eq!(zsk.key_tag(), zsk_tag);
}

#[tokio::test]
async fn regen_rotates_tlsa_but_keeps_the_ksk_signature() {
    let (store, _, _) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.init().await.unwrap();
    ns.export().await.unwrap();

    let before = ns.authority().zone().to_vec();
    let tlsa_before: Vec<_> = before
        .iter()
        .filter(|record| record.rtype() == Rtype::TLSA)
        .cloned()
        .collect();
    let dnskey_sig_before = rrsigs_covering(&before, Rtype::DNSKEY);

    // Rotate the certificate, then run the regeneration pipeline in a
    // fresh instance, as a restarted process would.
    store
        .write(&paths::certificate(DOMAIN), &fake_pem(b"rotated certificate"))
        .await
        .unwrap();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.restore().await.unwrap();
    ns.regenerate_tlsa().await.unwrap();

    let after = ns.authority().zone().to_vec();
    assert_eq!(before.len(), after.len());

    // The TLSA pair changed with the certificate.
    let tlsa_after: Vec<_> = after
        .iter()
        .filter(|record| record.rtype() == Rtype::TLSA)
        .cloned()
        .collect();
    assert_eq!(tlsa_after.len(), 2);
    for (old, new) in tlsa_before.iter().zip(&tlsa_after) {
        assert_eq!(old.owner(), new.owner());
        assert_ne!(old.data(), new.data());
    }

    // The TLSA signatures follow the new data.
    for (old, new) in rrsigs_covering(&before, Rtype::TLSA)
        .iter()
        .zip(&rrsigs_covering(&after, Rtype::TLSA))
    {
        assert_ne!(old.data(), new.data());
    }

    // The KSK's DNSKEY signature survives byte for byte.
    let dnskey_sig_after = rrsigs_covering(&after, Rtype::DNSKEY);
    assert_eq!(dnskey_sig_before.len(), 1);
    assert_eq!(dnskey_sig_after.len(), 1);
    assert_eq!(dnskey_sig_before[0].data(), dnskey_sig_after[0].data());
}

#[tokio::test]
async fn regen_refuses_to_run_without_a_zone() {
    let (store, _, _) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();

    // Neither initialized nor restored: there is nothing to re-sign, and
    // publishing a TLSA-only zone would be worse than failing.
    assert!(ns.regenerate_tlsa().await.is_err());
    assert!(ns.authority().zone().to_vec().is_empty());
}

#[tokio::test]
async fn exported_zone_restores_to_the_same_records() {
    let (store, _, _) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.init().await.unwrap();
    ns.export().await.unwrap();
    let before = ns.authority().zone().to_vec();

    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.restore().await.unwrap();
    let after = ns.authority().zone().to_vec();

    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.owner(), new.owner());
        assert_eq!(old.rtype(), new.rtype());
    }
}

#[tokio::test]
async fn exported_text_is_clean() {
    let (store, _, _) = seeded_store();
    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    ns.init().await.unwrap();

    let text = ns.zone_text();
    assert!(text.ends_with('\n'));

    let lines: Vec<_> = text.lines().collect();
    let unique: std::collections::HashSet<_> = lines.iter().collect();
    assert_eq!(lines.len(), unique.len(), "exported text repeats lines");
    for line in &lines {
        assert!(!line.contains("  "), "run of spaces in: {line}");
    }
}

#[tokio::test]
async fn load_rejects_a_mismatched_configuration() {
    let (store, _, _) = seeded_store();
    store
        .write(
            &paths::config(DOMAIN),
            &CONFIG.replace("example.test.", "other.test."),
        )
        .await
        .unwrap();
    assert!(AuthNs::load(&store, DOMAIN).await.is_err());
}

#[tokio::test]
async fn init_fails_without_a_certificate() {
    let (ksk_public, ksk_private, _) = generate_key(257);
    let (zsk_public, zsk_private, _) = generate_key(256);
    let store = MemStore::new()
        .with(&paths::config(DOMAIN), CONFIG)
        .with(&paths::key_file(DOMAIN, "ksk", "ksk.key"), &ksk_public)
        .with(&paths::key_file(DOMAIN, "ksk", "ksk.private"), &ksk_private)
        .with(&paths::key_file(DOMAIN, "zsk", "zsk.key"), &zsk_public)
        .with(&paths::key_file(DOMAIN, "zsk", "zsk.private"), &zsk_private);

    let ns = AuthNs::load(&store, DOMAIN).await.unwrap();
    assert!(ns.init().await.is_err());
}
