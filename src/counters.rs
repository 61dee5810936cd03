//! Potential optative counters
//!
//! A finite optative governing the particle ἄν is a reliable marker of the
//! potential optative. Participles and infinitives governing ἄν may continue
//! a potential optative in indirect discourse, so they are counted
//! separately as candidates that need manual review.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::tree::{Node, ParsedPassage, Tree};

/// Lemma of the modal particle
pub const PARTICLE_LEMMA: &str = "ἄν";

/// Part-of-speech tag of the governing verb
pub const VERB_UPOS: &str = "VERB";

/// A required morphological feature value on the governing verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorphTest {
    pub feature: &'static str,
    pub value: &'static str,
}

impl MorphTest {
    pub const fn new(feature: &'static str, value: &'static str) -> Self {
        Self { feature, value }
    }
}

/// Finite optative (`Mood=Opt`)
pub const FINITE_OPTATIVE: MorphTest = MorphTest::new("Mood", "Opt");
/// Participle (`VerbForm=Part`)
pub const PARTICIPLE: MorphTest = MorphTest::new("VerbForm", "Part");
/// Infinitive (`VerbForm=Inf`)
pub const INFINITIVE: MorphTest = MorphTest::new("VerbForm", "Inf");

/// True when `node` is a verb passing `test` with ἄν among its direct dependents
pub fn is_verb_with_particle(tree: &Tree, node: &Node, test: MorphTest) -> bool {
    node.upos == VERB_UPOS
        && node.feats.get(test.feature) == Some(test.value)
        && tree.children(node.id).any(|child| child.lemma == PARTICLE_LEMMA)
}

/// Count the verbs in `parse` that pass `test` and govern ἄν
pub fn count_verbs_with_particle(parse: &ParsedPassage, test: MorphTest) -> u64 {
    parse
        .tokens()
        .filter(|(tree, node)| is_verb_with_particle(tree, node, test))
        .count() as u64
}

/// Forms of the matching verbs, for reviewing candidates by hand
pub fn matching_tokens(parse: &ParsedPassage, test: MorphTest) -> Vec<&str> {
    parse
        .tokens()
        .filter(|(tree, node)| is_verb_with_particle(tree, node, test))
        .map(|(_, node)| node.form.as_str())
        .collect()
}

pub fn count_finite_potential_optatives(parse: &ParsedPassage) -> u64 {
    count_verbs_with_particle(parse, FINITE_OPTATIVE)
}

pub fn count_participial_candidates(parse: &ParsedPassage) -> u64 {
    count_verbs_with_particle(parse, PARTICIPLE)
}

pub fn count_infinitival_candidates(parse: &ParsedPassage) -> u64 {
    count_verbs_with_particle(parse, INFINITIVE)
}

/// Per-passage counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub n_pot_opt: u64,
    pub n_part_opt_candidate: u64,
    pub n_inf_opt_candidate: u64,
}

impl Counts {
    pub fn new(n_pot_opt: u64, n_part_opt_candidate: u64, n_inf_opt_candidate: u64) -> Self {
        Self {
            n_pot_opt,
            n_part_opt_candidate,
            n_inf_opt_candidate,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        Counts {
            n_pot_opt: self.n_pot_opt + other.n_pot_opt,
            n_part_opt_candidate: self.n_part_opt_candidate + other.n_part_opt_candidate,
            n_inf_opt_candidate: self.n_inf_opt_candidate + other.n_inf_opt_candidate,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Counts) {
        *self = *self + other;
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), Add::add)
    }
}

impl<'a> Sum<&'a Counts> for Counts {
    fn sum<I: Iterator<Item = &'a Counts>>(iter: I) -> Counts {
        iter.copied().sum()
    }
}

/// Run all three counters over one parse
pub fn count_potential_optatives(parse: &ParsedPassage) -> Counts {
    Counts {
        n_pot_opt: count_finite_potential_optatives(parse),
        n_part_opt_candidate: count_participial_candidates(parse),
        n_inf_opt_candidate: count_infinitival_candidates(parse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conllu::parse_document;

    fn passage(conllu: &str) -> ParsedPassage {
        ParsedPassage::new(parse_document(conllu).unwrap())
    }

    #[test]
    fn test_finite_optative_with_particle() {
        // [VERB(Mood=Opt, child ἄν), NOUN, VERB(Mood=Ind)]
        let mut tree = Tree::new();
        tree.add_node(Node::new(0, "ποιήσειεν", "ποιέω", "VERB", "root").with_feature("Mood", "Opt"));
        tree.add_node(Node::new(1, "ἄν", "ἄν", "ADV", "advmod"));
        tree.add_node(Node::new(2, "πόλις", "πόλις", "NOUN", "nsubj"));
        tree.add_node(Node::new(3, "ἔστι", "εἰμί", "VERB", "conj").with_feature("Mood", "Ind"));
        tree.set_parent(1, 0);
        tree.set_parent(2, 0);
        tree.set_parent(3, 0);
        let parse = ParsedPassage::new(vec![tree]);

        assert_eq!(count_finite_potential_optatives(&parse), 1);
        assert_eq!(count_participial_candidates(&parse), 0);
        assert_eq!(matching_tokens(&parse, FINITE_OPTATIVE), vec!["ποιήσειεν"]);
    }

    #[test]
    fn test_particle_must_be_direct_child() {
        let parse = passage(
            "1\tεἴποι\tλέγω\tVERB\t_\tMood=Opt\t0\troot\t_\t_\n\
2\tτις\tτις\tPRON\t_\t_\t1\tnsubj\t_\t_\n\
3\tἄν\tἄν\tADV\t_\t_\t2\tadvmod\t_\t_\n",
        );
        assert_eq!(count_finite_potential_optatives(&parse), 0);
    }

    #[test]
    fn test_particle_as_head_does_not_count() {
        let parse = passage(
            "1\tἄν\tἄν\tADV\t_\t_\t0\troot\t_\t_\n\
2\tεἴποι\tλέγω\tVERB\t_\tMood=Opt\t1\tdep\t_\t_\n",
        );
        assert_eq!(count_finite_potential_optatives(&parse), 0);
    }

    #[test]
    fn test_requires_verb_pos() {
        let parse = passage(
            "1\tεἴη\tεἰμί\tAUX\t_\tMood=Opt\t0\troot\t_\t_\n\
2\tἄν\tἄν\tADV\t_\t_\t1\tadvmod\t_\t_\n",
        );
        assert_eq!(count_finite_potential_optatives(&parse), 0);
    }

    #[test]
    fn test_participle_and_infinitive_candidates() {
        let parse = passage(
            "1\tοἴεσθαι\tοἴομαι\tVERB\t_\tVerbForm=Inf\t0\troot\t_\t_\n\
2\tποιῆσαι\tποιέω\tVERB\t_\tTense=Aor|VerbForm=Inf\t1\txcomp\t_\t_\n\
3\tἄν\tἄν\tADV\t_\t_\t2\tadvmod\t_\t_\n\
4\tδυνάμενοι\tδύναμαι\tVERB\t_\tCase=Nom|VerbForm=Part\t1\tadvcl\t_\t_\n\
5\tἄν\tἄν\tADV\t_\t_\t4\tadvmod\t_\t_\n\
\n\
1\tλάβοι\tλαμβάνω\tVERB\t_\tMood=Opt|VerbForm=Fin\t0\troot\t_\t_\n\
2\tἄν\tἄν\tADV\t_\t_\t1\tadvmod\t_\t_\n\
3\tλαβών\tλαμβάνω\tVERB\t_\tVerbForm=Part\t1\tadvcl\t_\t_\n",
        );

        assert_eq!(count_potential_optatives(&parse), Counts::new(1, 1, 1));
        assert_eq!(matching_tokens(&parse, INFINITIVE), vec!["ποιῆσαι"]);
        assert_eq!(matching_tokens(&parse, PARTICIPLE), vec!["δυνάμενοι"]);
    }

    #[test]
    fn test_counts_each_verb_independently() {
        let parse = passage(
            "1\tεἴποι\tλέγω\tVERB\t_\tMood=Opt\t0\troot\t_\t_\n\
2\tἄν\tἄν\tADV\t_\t_\t1\tadvmod\t_\t_\n\
3\tἄν\tἄν\tADV\t_\t_\t1\tadvmod\t_\t_\n\
4\tπράξειε\tπράσσω\tVERB\t_\tMood=Opt\t1\tconj\t_\t_\n\
5\tἄν\tἄν\tADV\t_\t_\t4\tadvmod\t_\t_\n",
        );
        // Two particles on one verb still make one construction
        assert_eq!(count_finite_potential_optatives(&parse), 2);
    }

    #[test]
    fn test_empty_parse() {
        assert!(count_potential_optatives(&ParsedPassage::default()).is_zero());
    }

    #[test]
    fn test_counts_sum() {
        let rows = [Counts::new(1, 0, 0), Counts::new(0, 1, 0), Counts::new(2, 0, 1)];
        assert_eq!(rows.iter().sum::<Counts>(), Counts::new(3, 1, 1));

        let mut total = Counts::default();
        total += Counts::new(1, 2, 3);
        assert_eq!(total + total, Counts::new(2, 4, 6));
    }
}
