//-
// Copyright (c) 2020, 2026, Jason Lingle
//
// This file is part of Newsgrab.
//
// Newsgrab is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Newsgrab is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Newsgrab. If not, see <http://www.gnu.org/licenses/>.

//! Fixtures shared between tests.

use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

lazy_static::lazy_static! {
    pub static ref CERTIFICATE_PRIVATE_KEY: PKey<Private> =
        PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    /// A self-signed certificate for `CERTIFICATE_PRIVATE_KEY`, which no
    /// verifying client will accept.
    pub static ref CERTIFICATE: openssl::x509::X509 = {
        let mut name = openssl::x509::X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "news.example.invalid").unwrap();
        let name = name.build();

        let mut builder = openssl::x509::X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&CERTIFICATE_PRIVATE_KEY).unwrap();
        builder
            .set_not_before(&openssl::asn1::Asn1Time::from_unix(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&openssl::asn1::Asn1Time::days_from_now(2).unwrap())
            .unwrap();
        builder
            .sign(
                &CERTIFICATE_PRIVATE_KEY,
                openssl::hash::MessageDigest::sha256(),
            )
            .unwrap();
        builder.build()
    };
}

/// One `XOVER` line for article `number` dated `date`.
pub fn overview_line(number: u64, date: &str) -> String {
    format!(
        "{}\tSubject {}\tposter@example.com\t{}\t\
         <{}@example.com>\t\t1024\t12\r\n",
        number, number, date, number
    )
}

/// A complete `ARTICLE` response for article `number`.
///
/// Nothing in it is dot-stuffed, so it is also exactly the text the client
/// reconstructs from it.
pub fn article_response(number: u64) -> String {
    format!(
        "220 {} <{}@example.com>\r\n\
         Subject: Subject {}\r\n\
         \r\n\
         Body of {}\r\n\
         .\r\n",
        number, number, number, number
    )
}

