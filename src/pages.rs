//! Page selector parsing
//!
//! Turns a textual page selection such as `"1-3,7,10-12"` into a [`PageSpec`],
//! a set of 1-based page numbers.
//!
//! Grammar: `spec := token (',' token)*`, `token := INT | INT '-' INT`.
//! Whitespace around tokens and operands is ignored. Page numbers are never
//! checked against a document here; a number past the end of a document
//! simply matches nothing when the selection is applied.

use std::fmt;
use std::str::FromStr;

use crate::error::PageSpecError;

/// A non-empty set of 1-based page numbers
///
/// Stored as sorted, disjoint, non-adjacent inclusive ranges so that wide
/// selections like `1-100000` stay small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    ranges: Vec<(u32, u32)>,
}

impl PageSpec {
    /// Parse a page selector
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_stamper::pages::PageSpec;
    ///
    /// let spec = PageSpec::parse("1-3,7").unwrap();
    /// assert_eq!(spec.iter().collect::<Vec<_>>(), vec![1, 2, 3, 7]);
    /// ```
    pub fn parse(input: &str) -> Result<Self, PageSpecError> {
        if input.trim().is_empty() {
            return Err(PageSpecError::EmptySelection);
        }

        let mut ranges = Vec::new();
        for raw in input.split(',') {
            let token = raw.trim();
            let range = match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(start, token)?;
                    let end = parse_page_number(end, token)?;
                    if start > end {
                        return Err(malformed(token));
                    }
                    (start, end)
                }
                None => {
                    let page = parse_page_number(token, token)?;
                    (page, page)
                }
            };
            ranges.push(range);
        }

        Ok(Self::from_ranges(ranges))
    }

    /// Select every page of a document with `page_count` pages (`1-N`)
    pub fn all(page_count: u32) -> Result<Self, PageSpecError> {
        if page_count == 0 {
            return Err(PageSpecError::EmptySelection);
        }
        Ok(Self {
            ranges: vec![(1, page_count)],
        })
    }

    fn from_ranges(mut ranges: Vec<(u32, u32)>) -> Self {
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                // Overlapping or adjacent: 1-3 and 4 collapse into 1-4
                Some(last) if start <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        Self { ranges: merged }
    }

    /// Whether the 1-based `page` is selected
    pub fn contains(&self, page: u32) -> bool {
        self.ranges
            .binary_search_by(|&(start, end)| {
                if end < page {
                    std::cmp::Ordering::Less
                } else if start > page {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Number of selected pages
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(start, end)| u64::from(end - start) + 1)
            .sum()
    }

    /// Always false for a successfully parsed selection
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Selected page numbers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }

    /// Selected pages that exist in a document of `page_count` pages
    pub fn matching(&self, page_count: u32) -> impl Iterator<Item = u32> + '_ {
        self.iter().take_while(move |&page| page <= page_count)
    }
}

fn parse_page_number(operand: &str, token: &str) -> Result<u32, PageSpecError> {
    let operand = operand.trim();
    // u32::from_str accepts a leading '+', the grammar does not
    if operand.is_empty() || !operand.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(token));
    }
    // No upper bound: a number past u32 selects nothing more than u32::MAX does
    let page = operand.parse::<u32>().unwrap_or(u32::MAX);
    if page == 0 {
        return Err(malformed(token));
    }
    Ok(page)
}

fn malformed(token: &str) -> PageSpecError {
    PageSpecError::MalformedToken {
        token: token.to_string(),
    }
}

impl FromStr for PageSpec {
    type Err = PageSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: ascending, merged ranges, e.g. `1-3,7`
impl fmt::Display for PageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &(start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(spec: &str) -> Vec<u32> {
        PageSpec::parse(spec).unwrap().iter().collect()
    }

    #[test]
    fn test_parse_examples() {
        assert_eq!(pages("2"), vec![2]);
        assert_eq!(pages("1-3"), vec![1, 2, 3]);
        assert_eq!(pages("1,3,5"), vec![1, 3, 5]);
        assert_eq!(pages("1-3,7,10-12"), vec![1, 2, 3, 7, 10, 11, 12]);
        assert_eq!(pages("1-3,7"), vec![1, 2, 3, 7]);
    }

    #[test]
    fn test_single_page_range() {
        assert_eq!(pages("5-5"), vec![5]);
    }

    #[test]
    fn test_duplicates_collapse() {
        assert_eq!(pages("3,1-4,2,4"), vec![1, 2, 3, 4]);
        assert_eq!(PageSpec::parse("3,1-4,2,4").unwrap().len(), 4);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(pages("  1 , 3 - 4 ,6 "), vec![1, 3, 4, 6]);
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(PageSpec::parse(""), Err(PageSpecError::EmptySelection));
        assert_eq!(PageSpec::parse("   \t"), Err(PageSpecError::EmptySelection));
    }

    #[test]
    fn test_reversed_range_is_malformed() {
        assert_eq!(
            PageSpec::parse("3-1"),
            Err(PageSpecError::MalformedToken {
                token: "3-1".to_string()
            })
        );
    }

    #[test]
    fn test_huge_numbers_are_not_an_error() {
        let spec = PageSpec::parse("1-99999999999").unwrap();
        assert_eq!(spec.matching(3).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(spec, PageSpec::parse("1-4294967295").unwrap());

        let spec = PageSpec::parse("99999999999").unwrap();
        assert!(!spec.contains(1));
        assert_eq!(spec.matching(3).count(), 0);
    }

    #[test]
    fn test_malformed_tokens_abort_whole_spec() {
        for bad in ["a", "1,b", "1-", "-3", "1-2-3", "1,,2", "1,", "0", "0-2", "+4", "1.5", "00", "0-99999999999"] {
            assert!(
                matches!(PageSpec::parse(bad), Err(PageSpecError::MalformedToken { .. })),
                "expected '{}' to be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_no_upper_bound_at_parse_time() {
        let spec = PageSpec::parse("1000-2000").unwrap();
        assert!(spec.contains(1500));
        assert_eq!(spec.matching(3).count(), 0);
    }

    #[test]
    fn test_contains() {
        let spec = PageSpec::parse("1-3,7,10-12").unwrap();
        for page in [1, 2, 3, 7, 10, 11, 12] {
            assert!(spec.contains(page));
        }
        for page in [0, 4, 6, 8, 9, 13, 100] {
            assert!(!spec.contains(page));
        }
    }

    #[test]
    fn test_canonical_form_round_trips() {
        for input in ["7, 1-3", "1,2,3,4", "5-5", "10-12,1-3,7,2", "4-9,1-5"] {
            let spec = PageSpec::parse(input).unwrap();
            let reparsed = PageSpec::parse(&spec.to_string()).unwrap();
            assert_eq!(spec, reparsed);
        }
        assert_eq!(PageSpec::parse("1,2,3,4").unwrap().to_string(), "1-4");
        assert_eq!(PageSpec::parse("7, 1-3").unwrap().to_string(), "1-3,7");
    }

    #[test]
    fn test_all_pages() {
        assert_eq!(PageSpec::all(3).unwrap().to_string(), "1-3");
        assert_eq!(PageSpec::all(0), Err(PageSpecError::EmptySelection));
    }

    #[test]
    fn test_matching_clips_to_document() {
        let spec = PageSpec::parse("2,4-6").unwrap();
        assert_eq!(spec.matching(5).collect::<Vec<_>>(), vec![2, 4, 5]);
    }
}
