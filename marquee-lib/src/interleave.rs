//! Dialing order for dual-stack hosts, following
//! [RFC 8305 section 4](https://www.rfc-editor.org/rfc/rfc8305#section-4).

use crate::ResolvedAddress;

/// Reorder resolved addresses into IPv6-first, alternating families.
///
/// Addresses keep their relative order within their family. Once one family
/// runs out, the rest of the other family is appended unchanged. No address
/// is dropped or duplicated.
#[must_use]
pub fn interleave(addresses: Vec<ResolvedAddress>) -> Vec<ResolvedAddress> {
    let total = addresses.len();
    let (v6, v4): (Vec<_>, Vec<_>) = addresses.into_iter().partition(ResolvedAddress::is_ipv6);

    let mut ordered = Vec::with_capacity(total);
    let mut v6 = v6.into_iter();
    let mut v4 = v4.into_iter();
    loop {
        match (v6.next(), v4.next()) {
            (Some(a), Some(b)) => ordered.extend([a, b]),
            (Some(a), None) => {
                ordered.push(a);
                ordered.extend(v6);
                break;
            }
            (None, Some(b)) => {
                ordered.push(b);
                ordered.extend(v4);
                break;
            }
            (None, None) => break,
        }
    }
    ordered
}
