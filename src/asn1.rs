//! DER building blocks shared by the message structures.

use der::asn1::Any;
use der::{
    Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence, Tag,
    Writer,
};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

/// `SET OF` decoded without DER ordering checks and re-encoded in stored
/// order, so parsed messages re-serialise byte for byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SetOf<T>(pub Vec<T>);

/// Borrowed counterpart of [`SetOf`] for encoding.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SetOfRef<'a, T>(pub &'a [T]);

impl<T> FixedTag for SetOf<T> {
    const TAG: Tag = Tag::Set;
}

impl<T> FixedTag for SetOfRef<'_, T> {
    const TAG: Tag = Tag::Set;
}

impl<'a, T: Decode<'a>> DecodeValue<'a> for SetOf<T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut items = Vec::new();
            while !reader.is_finished() {
                items.push(reader.decode()?);
            }
            Ok(SetOf(items))
        })
    }
}

impl<T: Encode> EncodeValue for SetOf<T> {
    fn value_len(&self) -> der::Result<Length> {
        SetOfRef(&self.0).value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        SetOfRef(&self.0).encode_value(writer)
    }
}

impl<T: Encode> EncodeValue for SetOfRef<'_, T> {
    fn value_len(&self) -> der::Result<Length> {
        self.0
            .iter()
            .try_fold(Length::ZERO, |acc, item| acc + item.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.iter().try_for_each(|item| item.encode(writer))
    }
}

/// Sum of encoded lengths.
pub(crate) fn total_len(lens: &[Length]) -> der::Result<Length> {
    lens.iter().try_fold(Length::ZERO, |acc, len| acc + *len)
}

/// `SET OF` in canonical DER form: elements sorted by their encodings.
pub(crate) fn der_sorted_set<T: Encode>(items: &[T]) -> der::Result<Vec<u8>> {
    let mut encoded = items
        .iter()
        .map(Encode::to_der)
        .collect::<der::Result<Vec<_>>>()?;
    encoded.sort();

    let body_len = encoded.iter().map(Vec::len).sum::<usize>();
    let mut out = Header::new(Tag::Set, Length::try_from(body_len)?)?.to_der()?;
    for item in encoded {
        out.extend_from_slice(&item);
    }
    Ok(out)
}

/// Re-encode any DER value as an [`Any`].
pub(crate) fn to_any<T: Encode>(value: &T) -> der::Result<Any> {
    Any::from_der(&value.to_der()?)
}

/// Decode an [`Any`] as `T`.
pub(crate) fn from_any<T: for<'a> Decode<'a>>(any: &Any) -> der::Result<T> {
    T::from_der(&any.to_der()?)
}

/// Certificate reference by issuer name and serial number.
///
/// ```text
/// IssuerAndSerialNumber ::= SEQUENCE {
///   issuer Name,
///   serialNumber CertificateSerialNumber }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerAndSerialNumber {
    /// Issuer of the certificate.
    pub issuer: Name,
    /// Serial number assigned by the issuer.
    pub serial_number: SerialNumber,
}

impl IssuerAndSerialNumber {
    /// Identify `cert` by its issuer and serial number.
    pub fn from_certificate(cert: &Certificate) -> Self {
        IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        }
    }

    /// Whether `cert` is the certificate referenced.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.issuer == cert.tbs_certificate.issuer
            && self.serial_number == cert.tbs_certificate.serial_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::asn1::OctetString;
    use hex_literal::hex;

    #[test]
    fn set_keeps_parsed_order() {
        // SET { OCTET STRING 02, OCTET STRING 01 } is not DER-sorted.
        let bytes = hex!("3106040102040101");
        let set = SetOf::<OctetString>::from_der(&bytes).unwrap();
        assert_eq!(set.0.len(), 2);
        assert_eq!(set.to_der().unwrap(), bytes);
    }

    #[test]
    fn sorted_set_orders_encodings() {
        let items = [
            OctetString::new(vec![2u8]).unwrap(),
            OctetString::new(vec![1u8]).unwrap(),
        ];
        assert_eq!(der_sorted_set(&items).unwrap(), hex!("3106040101040102"));
    }

    #[test]
    fn empty_set() {
        let set = SetOf::<OctetString>(Vec::new());
        assert_eq!(set.to_der().unwrap(), hex!("3100"));
        assert_eq!(SetOf::<OctetString>::from_der(&hex!("3100")).unwrap(), set);
    }
}
