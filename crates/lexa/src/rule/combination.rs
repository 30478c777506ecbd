use super::{Rule, RuleRef, TryResult};
use crate::context::Context;
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;
use log::trace;

/// Members in any order, each at most once.
///
/// Parsing stops when no member matches. A member matching a second time
/// is reported as [`ErrorKind::CombinationDuplicate`] and ends the
/// combination successfully; the duplicate's input stays consumed. Unless
/// partial, a combination that stopped before every member matched reports
/// [`ErrorKind::ExhaustedChoice`].
#[derive(Debug)]
pub struct Combination<U: CodeUnit> {
    members: Vec<RuleRef<U>>,
    partial: bool,
}

impl<U: CodeUnit> Combination<U> {
    /// Every member exactly once
    #[must_use]
    pub const fn new(members: Vec<RuleRef<U>>) -> Self {
        Self {
            members,
            partial: false,
        }
    }

    /// Every member at most once
    #[must_use]
    pub const fn partial(members: Vec<RuleRef<U>>) -> Self {
        Self { members, partial: true }
    }
}

impl<U: CodeUnit> Rule<U> for Combination<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let mut seen = vec![false; self.members.len()];
        let mut matched = 0;

        while matched < self.members.len() {
            let begin = reader.position();
            let mut taken = None;
            for (index, member) in self.members.iter().enumerate() {
                match member.try_parse(ctx, reader, values) {
                    TryResult::Backtracked => continue,
                    TryResult::Canceled => return false,
                    TryResult::Ok => {
                        taken = Some(index);
                        break;
                    }
                }
            }

            match taken {
                None => break,
                Some(index) if seen[index] => {
                    trace!("combination member {index} repeated at {begin}");
                    let span = Span::new(begin, reader.position());
                    ctx.report(ErrorKind::CombinationDuplicate, begin, span);
                    return true;
                }
                Some(index) => {
                    seen[index] = true;
                    matched += 1;
                }
            }
        }

        if !self.partial && matched < self.members.len() {
            let position = reader.position();
            ctx.report(ErrorKind::ExhaustedChoice, position, Span::empty(position));
            return false;
        }
        true
    }
}
