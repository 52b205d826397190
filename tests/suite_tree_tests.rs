//! # Suite Tree Tests / 套件树测试
//!
//! Structural invariants of the suite tree: counting, lookups, ordering and
//! loop-free attachment.
//!
//! 套件树的结构不变量：计数、查找、顺序以及无环挂接。

mod common;

use common::tree_1_2_4;
use prova::core::case::TestCase;
use prova::core::suite::SuiteTree;

#[cfg(test)]
mod counting_tests {
    use super::*;

    #[test]
    fn test_recursive_suite_count() {
        let (tree, root) = tree_1_2_4();
        assert_eq!(tree.number_of_test_suites(root, true), 7);
        assert_eq!(tree.number_of_test_suites(root, false), 1);
    }

    #[test]
    fn test_has_test_case_only_recursively() {
        let (mut tree, root) = tree_1_2_4();
        let a = tree.get_test_suite(root, "a").unwrap();
        let b2 = tree.get_test_suite(a, "b2").unwrap();
        let c4 = tree.get_test_suite(b2, "c4").unwrap();
        tree.add_test_case(c4, TestCase::new("deep").unwrap()).unwrap();

        assert!(!tree.has_test_case(root, "deep", false));
        assert!(tree.has_test_case(root, "deep", true));
        assert!(tree.get_test_case(root, "deep").is_err());
        assert_eq!(tree.number_of_test_cases(root, true), 1);
        assert_eq!(tree.number_of_test_cases(root, false), 0);
    }

    #[test]
    fn test_get_test_suite_is_direct_only() {
        let (tree, root) = tree_1_2_4();
        assert!(tree.get_test_suite(root, "b1").is_err());
        assert!(tree.has_test_suite(root, "b1", true));
        assert!(!tree.has_test_suite(root, "b1", false));
        assert!(tree.has_test_suite(root, "root", false));
    }
}

#[cfg(test)]
mod root_parent_tests {
    use super::*;

    #[test]
    fn test_root_parent_has_no_parent() {
        let (tree, root) = tree_1_2_4();
        for suite in tree.descendants(root) {
            let top = tree.root_parent(suite);
            assert_eq!(top, root);
            assert!(tree.parent(top).is_none());
        }
        assert_eq!(tree.root_parent(root), root);
        assert_eq!(tree.root_parent(tree.root_parent(root)), root);
    }

    #[test]
    fn test_paths() {
        let (tree, root) = tree_1_2_4();
        let a = tree.get_test_suite(root, "a").unwrap();
        let b1 = tree.get_test_suite(a, "b1").unwrap();
        let c2 = tree.get_test_suite(b1, "c2").unwrap();
        assert_eq!(tree.path(c2), "root/a/b1/c2");
    }
}

#[cfg(test)]
mod attachment_tests {
    use super::*;

    #[test]
    fn test_self_attachment_fails() {
        let mut tree = SuiteTree::new();
        let s = tree.create_suite("s").unwrap();
        assert!(tree.add_test_suite(s, s).is_err());
        assert_eq!(tree.number_of_test_suites(s, true), 0);
    }

    #[test]
    fn test_attaching_an_ancestor_below_a_descendant_fails() {
        let (mut tree, root) = tree_1_2_4();
        let a = tree.get_test_suite(root, "a").unwrap();
        let b1 = tree.get_test_suite(a, "b1").unwrap();
        let c1 = tree.get_test_suite(b1, "c1").unwrap();

        let err = tree.add_test_suite(c1, root).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(tree.number_of_test_suites(c1, true), 0);
        assert_eq!(tree.number_of_test_suites(root, true), 7);
        assert_eq!(tree.parent(root), None);

        assert!(tree.add_test_suite(b1, a).is_err());
        assert_eq!(tree.number_of_test_suites(b1, false), 2);
    }

    #[test]
    fn test_duplicate_suite_id_in_tree_fails() {
        let (mut tree, root) = tree_1_2_4();
        let other = tree.create_suite("c3").unwrap();
        assert!(tree.add_test_suite(root, other).is_err());
        assert_eq!(tree.number_of_test_suites(root, false), 1);
        assert!(!tree.has_parent(other));
    }

    #[test]
    fn test_duplicate_case_is_rejected_and_tree_kept() {
        let mut tree = SuiteTree::new();
        let root = tree.create_suite("root").unwrap();
        tree.add_test_case(root, TestCase::new("tc").unwrap()).unwrap();
        let err = tree.add_test_case(root, TestCase::new("tc").unwrap()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(tree.number_of_test_cases(root, false), 1);

        // The same id is fine in another suite.
        let child = tree.create_suite("child").unwrap();
        tree.add_test_suite(root, child).unwrap();
        tree.add_test_case(child, TestCase::new("tc").unwrap()).unwrap();
        assert_eq!(tree.number_of_test_cases(root, true), 2);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut tree = SuiteTree::new();
        let root = tree.create_suite("root").unwrap();
        for id in ["zeta", "alpha", "mid"] {
            let s = tree.create_suite(id).unwrap();
            tree.add_test_suite(root, s).unwrap();
            tree.add_test_case(root, TestCase::new(id).unwrap()).unwrap();
        }
        let suites: Vec<&str> = tree.test_suites(root).iter().map(|&s| tree.id(s)).collect();
        assert_eq!(suites, ["zeta", "alpha", "mid"]);
        let cases: Vec<&str> = tree[root].test_cases().iter().map(TestCase::id).collect();
        assert_eq!(cases, ["zeta", "alpha", "mid"]);
    }
}
