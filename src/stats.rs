//! Chain-length statistics for diagnosing hash quality and fill.

use crate::dict::Dict;
use crate::dict_type::DictType;
use crate::generation::Generation;
use core::fmt;

/// Chain lengths at or above `STATS_VECTLEN - 1` share the last bin.
pub const STATS_VECTLEN: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    /// 0 for the primary generation, 1 for the rehash target.
    pub table: usize,
    pub size: usize,
    pub used: usize,
    /// Non-empty buckets.
    pub slots: usize,
    pub max_chain_len: usize,
    pub total_chain_len: usize,
    pub chain_len_histogram: [usize; STATS_VECTLEN],
}

impl GenerationStats {
    fn collect<T: DictType>(dict: &Dict<T>, table: usize, gen: &Generation) -> Self {
        let mut stats = GenerationStats {
            table,
            size: gen.size(),
            used: gen.used,
            slots: 0,
            max_chain_len: 0,
            total_chain_len: 0,
            chain_len_histogram: [0; STATS_VECTLEN],
        };
        for head in gen.buckets.iter() {
            let mut len = 0;
            let mut cur = *head;
            while let Some(k) = cur {
                len += 1;
                cur = dict.entries[k].next;
            }
            stats.chain_len_histogram[len.min(STATS_VECTLEN - 1)] += 1;
            if len == 0 {
                continue;
            }
            stats.slots += 1;
            stats.max_chain_len = stats.max_chain_len.max(len);
            stats.total_chain_len += len;
        }
        stats
    }

    pub fn avg_chain_len_counted(&self) -> f64 {
        if self.slots == 0 {
            return 0.0;
        }
        self.total_chain_len as f64 / self.slots as f64
    }

    pub fn avg_chain_len_computed(&self) -> f64 {
        if self.slots == 0 {
            return 0.0;
        }
        self.used as f64 / self.slots as f64
    }
}

impl fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.used == 0 {
            return writeln!(f, "No stats available for empty dictionaries");
        }
        let role = if self.table == 0 {
            "main hash table"
        } else {
            "rehashing target"
        };
        writeln!(f, "Hash table {} stats ({}):", self.table, role)?;
        writeln!(f, " table size: {}", self.size)?;
        writeln!(f, " number of elements: {}", self.used)?;
        writeln!(f, " different slots: {}", self.slots)?;
        writeln!(f, " max chain length: {}", self.max_chain_len)?;
        writeln!(f, " avg chain length (counted): {:.2}", self.avg_chain_len_counted())?;
        writeln!(f, " avg chain length (computed): {:.2}", self.avg_chain_len_computed())?;
        writeln!(f, " Chain length distribution:")?;
        for (len, &n) in self.chain_len_histogram.iter().enumerate() {
            if n == 0 {
                continue;
            }
            writeln!(
                f,
                "   {}: {} ({:.2}%)",
                len,
                n,
                n as f64 * 100.0 / self.size as f64
            )?;
        }
        Ok(())
    }
}

/// Statistics of every live generation of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct DictStats {
    pub generations: Vec<GenerationStats>,
}

impl fmt::Display for DictStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in &self.generations {
            write!(f, "{g}")?;
        }
        Ok(())
    }
}

impl<T: DictType> Dict<T> {
    pub fn stats(&self) -> DictStats {
        let mut generations = vec![GenerationStats::collect(self, 0, &self.ht[0])];
        if self.is_rehashing() {
            generations.push(GenerationStats::collect(self, 1, &self.ht[1]));
        }
        DictStats { generations }
    }
}

#[cfg(test)]
mod tests {
    use crate::dict::test_types::*;
    use crate::dict::Dict;
    use std::rc::Rc;

    #[test]
    fn stats_of_empty_table() {
        let d: Dict<StrKeys> = Dict::new(str_keys());
        let s = d.stats();
        assert_eq!(s.generations.len(), 1);
        assert_eq!(s.to_string(), "No stats available for empty dictionaries\n");
    }

    /// Invariant: histogram and counters agree with the table contents.
    #[test]
    fn stats_count_chains() {
        let mut d = Dict::new(str_keys());
        for i in 0..100 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let s = d.stats();
        assert_eq!(s.generations.len(), if d.is_rehashing() { 2 } else { 1 });
        let total: usize = s.generations.iter().map(|g| g.used).sum();
        assert_eq!(total, 100);
        for g in &s.generations {
            assert_eq!(g.total_chain_len, g.used);
            assert_eq!(g.chain_len_histogram.iter().sum::<usize>(), g.size);
            assert!(g.max_chain_len >= 1 || g.used == 0);
        }
        let text = s.to_string();
        assert!(text.contains("Hash table 0 stats (main hash table):"));
        assert!(text.contains(" Chain length distribution:"));
    }

    #[test]
    fn long_chains_fold_into_last_bin() {
        let mut d = Dict::new(Rc::new(Colliding));
        for i in 0..60 {
            d.add(format!("c{i}"), i).unwrap();
        }
        while d.rehash(100) {}
        let stats = d.stats();
        let g = &stats.generations[0];
        assert_eq!(g.max_chain_len, 60);
        assert_eq!(g.slots, 1);
        assert_eq!(g.chain_len_histogram[super::STATS_VECTLEN - 1], 1);
        assert!((g.avg_chain_len_counted() - 60.0).abs() < 1e-9);
    }
}
