// Placement operations on a classroom grid.
//
// Every entry point takes display coordinates (row 0 = nearest the board)
// and translates them through `RowMapping` before touching storage.

use rand::Rng;
use tracing::{debug, info};

use crate::model::{create_grid, Classroom, Student};

/// Uniform in-place Fisher-Yates shuffle.
pub fn fisher_yates<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

impl Classroom {
    /// Seats `student` at the desk. Returns false and leaves the classroom
    /// untouched when the desk is full or does not exist.
    ///
    /// A real student who already sits elsewhere is moved. The free-seat
    /// marker never affects the roster.
    pub fn place(&mut self, display_row: usize, col: usize, student: Student) -> bool {
        let capacity = self.students_per_desk;
        match self.desk(display_row, col) {
            None => {
                debug!(display_row, col, "place outside the grid ignored");
                return false;
            }
            Some(desk) if desk.students.len() >= capacity => {
                debug!(desk = %desk.id, "desk is full, placement ignored");
                return false;
            }
            Some(desk)
                if !student.is_free_seat() && desk.students.iter().any(|s| s.id == student.id) =>
            {
                return false;
            }
            Some(_) => {}
        }

        if !student.is_free_seat() {
            self.unseat(&student.id);
            if !self.students.iter().any(|s| s.id == student.id) {
                self.students.push(student.clone());
            }
        }

        match self.desk_mut(display_row, col) {
            Some(desk) => {
                desk.students.push(student);
                desk.refresh();
                true
            }
            None => false,
        }
    }

    /// Takes the first student with `student_id` off the desk. A real student
    /// becomes available again through the roster.
    pub fn remove(&mut self, display_row: usize, col: usize, student_id: &str) -> Option<Student> {
        let desk = self.desk_mut(display_row, col)?;
        let index = desk.students.iter().position(|s| s.id == student_id)?;
        let removed = desk.students.remove(index);
        desk.refresh();
        Some(removed)
    }

    /// Drags a student from one desk to another.
    pub fn move_student(
        &mut self,
        from: (usize, usize),
        to: (usize, usize),
        student_id: &str,
    ) -> bool {
        if from == to {
            return false;
        }
        let capacity = self.students_per_desk;
        let student = match self.desk(from.0, from.1) {
            Some(desk) => desk.students.iter().find(|s| s.id == student_id).cloned(),
            None => None,
        };
        let Some(student) = student else {
            return false;
        };
        match self.desk(to.0, to.1) {
            Some(target) if target.students.len() < capacity => {}
            _ => return false,
        }

        self.remove(from.0, from.1, student_id);
        self.place(to.0, to.1, student)
    }

    /// Rebuilds the grid at the new shape. Every seated student returns to
    /// the roster; placements are not carried over.
    pub fn resize(
        &mut self,
        rows: Option<usize>,
        columns: Option<usize>,
        students_per_desk: Option<usize>,
    ) {
        let returned = self.seated_count();
        self.rows = rows.unwrap_or(self.rows).max(1);
        self.columns = columns.unwrap_or(self.columns).max(1);
        self.students_per_desk = students_per_desk.unwrap_or(self.students_per_desk).max(1);
        self.desks = create_grid(self.rows, self.columns, self.students_per_desk);
        info!(
            rows = self.rows,
            columns = self.columns,
            seats = self.students_per_desk,
            returned,
            "classroom resized"
        );
    }

    /// Shuffles the roster and seats it starting at the row nearest the
    /// board, left to right, filling each desk before the next one.
    /// Existing placements stay. Returns how many students were seated.
    pub fn auto_fill<R: Rng>(&mut self, rng: &mut R) -> usize {
        let mut pool: Vec<Student> = self.roster().into_iter().cloned().collect();
        fisher_yates(&mut pool, rng);
        let total = pool.len();
        let mut pool = pool.into_iter().peekable();

        let mapping = self.mapping();
        let seats = self.students_per_desk;
        for display_row in 0..self.rows {
            let Some(desks) = mapping
                .to_storage(display_row)
                .and_then(|row| self.desks.get_mut(row))
            else {
                continue;
            };
            for desk in desks.iter_mut() {
                while desk.students.len() < seats {
                    match pool.next() {
                        Some(student) => desk.students.push(student),
                        None => break,
                    }
                }
                desk.refresh();
            }
            if pool.peek().is_none() {
                break;
            }
        }

        let placed = total - pool.count();
        info!(placed, unseated = total - placed, "auto fill finished");
        placed
    }

    /// Empties every desk. Returns how many real students went back to the roster.
    pub fn reset(&mut self) -> usize {
        let returned = self.seated_count();
        for desk in self.desks.iter_mut().flatten() {
            desk.students.clear();
            desk.refresh();
        }
        returned
    }

    /// Toggles the exclusion filter of a known student.
    pub fn set_excluded(&mut self, student_id: &str, excluded: bool) -> bool {
        match self.students.iter_mut().find(|s| s.id == student_id) {
            Some(student) => {
                student.is_excluded = excluded;
                true
            }
            None => false,
        }
    }

    fn unseat(&mut self, student_id: &str) {
        for desk in self.desks.iter_mut().flatten() {
            if let Some(index) = desk.students.iter().position(|s| s.id == student_id) {
                desk.students.remove(index);
                desk.refresh();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapacityNotice, Desk, NoticeLevel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn students(n: usize) -> Vec<Student> {
        (0..n)
            .map(|i| {
                Student::new(format!("s{}", i), format!("Vorname{}", i), format!("Nachname{}", i))
            })
            .collect()
    }

    fn room(rows: usize, columns: usize, seats: usize, n: usize) -> Classroom {
        Classroom::new("Test", rows, columns, seats).with_students(students(n))
    }

    #[test]
    fn place_then_remove_restores_occupancy() {
        let mut room = room(3, 3, 2, 4);
        let before = room.clone();
        let student = room.students[2].clone();

        assert!(room.place(1, 2, student.clone()));
        assert_eq!(room.desks[1][2].students, vec![student.clone()]);
        assert!(!room.roster().contains(&&student));

        let removed = room.remove(1, 2, &student.id).unwrap();
        assert_eq!(removed, student);
        assert_eq!(room, before);
    }

    #[test]
    fn place_on_full_desk_is_noop() {
        let mut room = room(1, 1, 2, 3);
        let s = room.students.clone();
        assert!(room.place(0, 0, s[0].clone()));
        assert!(room.place(0, 0, s[1].clone()));

        let before = room.clone();
        assert!(!room.place(0, 0, s[2].clone()));
        assert_eq!(room, before);
        assert_eq!(room.desks[0][0].students.len(), 2);
        assert_eq!(room.roster(), vec![&s[2]]);
    }

    #[test]
    fn place_outside_grid_is_noop() {
        let mut room = room(2, 2, 1, 1);
        let s = room.students[0].clone();
        assert!(!room.place(2, 0, s.clone()));
        assert!(!room.place(0, 2, s));
        assert_eq!(room.seated_count(), 0);
    }

    #[test]
    fn placing_a_seated_student_moves_them() {
        let mut room = room(2, 2, 2, 1);
        let s = room.students[0].clone();
        assert!(room.place(0, 0, s.clone()));
        assert!(room.place(1, 1, s.clone()));
        assert_eq!(room.seated_count(), 1);
        assert!(room.desk(0, 0).unwrap().is_empty);
        assert_eq!(room.desk(1, 1).unwrap().students, vec![s]);
    }

    #[test]
    fn free_seat_marker_is_inexhaustible() {
        let mut room = room(1, 2, 2, 2);
        let roster_before: Vec<Student> = room.roster().into_iter().cloned().collect();
        assert!(room.place(0, 0, Student::free_seat()));
        assert!(room.place(0, 0, Student::free_seat()));
        assert!(room.place(0, 1, Student::free_seat()));

        let roster_after: Vec<Student> = room.roster().into_iter().cloned().collect();
        assert_eq!(roster_before, roster_after);
        assert_eq!(room.seated_count(), 0);
        assert!(!room.students.iter().any(|s| s.is_free_seat()));

        room.remove(0, 0, "free");
        assert_eq!(room.desks[0][0].students.len(), 1);
        assert_eq!(room.roster().len(), 2);
    }

    #[test]
    fn move_student_between_desks() {
        let mut room = room(2, 2, 1, 2);
        let s = room.students.clone();
        room.place(0, 0, s[0].clone());
        room.place(1, 1, s[1].clone());

        assert!(!room.move_student((0, 0), (1, 1), &s[0].id));
        assert!(room.move_student((0, 0), (0, 1), &s[0].id));
        assert!(room.desk(0, 0).unwrap().is_empty);
        assert_eq!(room.desk(0, 1).unwrap().students, vec![s[0].clone()]);
    }

    #[test]
    fn auto_fill_seats_everyone_front_rows_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut room = room(4, 3, 2, 10);
        let placed = room.auto_fill(&mut rng);

        assert_eq!(placed, 10);
        assert!(room.roster().is_empty());

        let ids: Vec<&str> = room
            .desks
            .iter()
            .flatten()
            .flat_map(|d| d.students.iter().map(|s| s.id.as_str()))
            .collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(unique.len(), 10);

        // Rows 3 and 2 hold 12 seats; the back rows stay empty.
        let per_row: Vec<usize> = room
            .desks
            .iter()
            .map(|row| row.iter().map(|d| d.students.len()).sum())
            .collect();
        assert_eq!(per_row, vec![0, 0, 4, 6]);
    }

    #[test]
    fn auto_fill_two_by_two_with_five_students() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut room = room(2, 2, 2, 5);
        room.auto_fill(&mut rng);

        assert_eq!(room.desks[1][0].students.len(), 2);
        assert_eq!(room.desks[1][1].students.len(), 2);
        assert_eq!(room.desks[0][0].students.len(), 1);
        assert!(room.desks[0][1].is_empty);
        assert!(room.roster().is_empty());

        let notice = room.capacity_notice();
        assert_eq!(notice, CapacityNotice::FreeSeats { free: 3 });
        assert_eq!(notice.level(), Some(NoticeLevel::Info));
    }

    #[test]
    fn auto_fill_stops_when_seats_run_out() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = room(1, 2, 1, 5);
        assert_eq!(room.auto_fill(&mut rng), 2);
        assert_eq!(room.roster().len(), 3);
        assert_eq!(room.capacity_notice(), CapacityNotice::Overbooked { unseated: 3 });
    }

    #[test]
    fn auto_fill_keeps_existing_placements_and_skips_excluded() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut room = room(2, 2, 1, 4);
        let first = room.students[0].clone();
        room.place(1, 1, first.clone());
        room.set_excluded("s3", true);

        assert_eq!(room.auto_fill(&mut rng), 2);
        assert_eq!(room.desk(1, 1).unwrap().students, vec![first]);
        assert!(!room.is_seated("s3"));
    }

    #[test]
    fn auto_fill_skips_rows_missing_from_storage() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut room = room(2, 2, 1, 3);
        room.rows = 3;
        // Display row 0 maps to storage row 2, which does not exist.
        assert_eq!(room.auto_fill(&mut rng), 3);
        assert!(room.desks[1].iter().all(|d| d.students.len() == 1));
        assert_eq!(room.desks[0].iter().map(Desk::occupied).sum::<usize>(), 1);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut items: Vec<u32> = (0..50).collect();
        fisher_yates(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn resize_returns_everyone_to_the_roster() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut room = room(2, 2, 2, 6);
        room.place(0, 0, Student::free_seat());
        room.auto_fill(&mut rng);
        room.resize(Some(3), None, Some(3));

        assert_eq!((room.rows, room.columns, room.students_per_desk), (3, 2, 3));
        assert_eq!(room.desks.len(), 3);
        assert!(room.desks.iter().flatten().all(|d| d.is_empty));
        assert_eq!(room.roster().len(), 6);
    }

    #[test]
    fn reset_empties_all_desks() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut room = room(2, 3, 2, 7);
        room.place(1, 2, Student::free_seat());
        room.auto_fill(&mut rng);

        assert_eq!(room.reset(), 7);
        assert!(room.desks.iter().flatten().all(|d| d.is_empty));
        assert_eq!(room.roster().len(), 7);
    }
}
